//! Production Environment implementation using the tokio clock.
//!
//! This module provides `SystemEnv`, the production implementation of the
//! `Environment` trait.

use keygate_core::Environment;

/// Production environment using the tokio clock.
///
/// Instants come from tokio rather than `std` so that deadlines handed to
/// `tokio::time::sleep_until` need no conversion, and so that tests running
/// with a paused tokio clock see the same time as the controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }
}
