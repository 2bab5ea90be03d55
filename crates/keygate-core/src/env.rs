//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples gate logic from the system clock. The
//! controller only ever reads time through it, which enables:
//!
//! - Deterministic simulation: the harness provides a virtual clock that
//!   advances only when a test says so, so navigation deadlines are exact.
//!
//! - Production runtime: the runtime crate reads the tokio clock, and its
//!   driver waits for deadlines itself. The controller never sleeps.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Isolation: implementations must not share global state

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing time.
///
/// This trait is the foundation of the sans-IO controller. Navigation
/// deadlines are computed as `env.now() + delay` and compared against the
/// instant carried by `Tick` events.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Point in time used for deadlines.
    type Instant: Copy
        + Ord
        + Debug
        + Send
        + Sync
        + Add<Duration, Output = Self::Instant>
        + Sub<Output = Duration>;

    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;
}
