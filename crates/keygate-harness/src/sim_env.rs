//! Simulated environment with a virtual clock.
//!
//! Time only moves when the test advances it, so navigation deadlines land
//! on exact, reproducible instants.

use std::{
    ops::{Add, Sub},
    sync::{Arc, Mutex},
    time::Duration,
};

use keygate_core::Environment;

/// Virtual instant: time elapsed since the simulation started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since the simulation started.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Environment backed by a shared virtual clock.
///
/// Clones share the clock, so a test can hold one clone and hand another to
/// the controller.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    clock: Arc<Mutex<Duration>>,
}

impl SimEnv {
    /// Create an environment at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward and return the new time.
    pub fn advance(&self, by: Duration) -> SimInstant {
        let mut clock = self.clock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *clock += by;
        SimInstant(*clock)
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> Self::Instant {
        let clock = self.clock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        SimInstant(*clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        let env = SimEnv::new();
        assert_eq!(env.now().elapsed(), Duration::ZERO);
    }

    #[test]
    fn clones_share_clock() {
        let env = SimEnv::new();
        let other = env.clone();

        env.advance(Duration::from_millis(250));

        assert_eq!(other.now().elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn advance_returns_new_time() {
        let env = SimEnv::new();
        let start = env.now();

        let later = env.advance(Duration::from_secs(3));

        assert_eq!(later - start, Duration::from_secs(3));
        assert_eq!(env.now(), later);
    }
}
