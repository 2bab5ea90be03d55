//! Gate configuration.

use std::time::Duration;

use crate::digest::TargetDigest;

/// Storage key the authenticated flag is persisted under.
pub const DEFAULT_STORAGE_KEY: &str = "admin_authenticated";

/// Route the gate navigates to after a successful login.
pub const DEFAULT_ADMIN_ROUTE: &str = "/admin";

/// Delay between login and navigation, leaving time for the notification to
/// render.
pub const DEFAULT_NAVIGATION_DELAY: Duration = Duration::from_millis(500);

/// Resolved configuration consumed by the controller.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Digest the window must hash to.
    pub target: TargetDigest,
    /// Storage key for the authenticated flag.
    pub storage_key: String,
    /// Privileged route navigated to after login.
    pub admin_route: String,
    /// Delay before navigating.
    pub navigation_delay: Duration,
}

impl GateConfig {
    /// Default configuration unlocking on `target`.
    pub fn new(target: TargetDigest) -> Self {
        Self { target, ..Self::default() }
    }

    /// Override the storage key.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Override the admin route.
    #[must_use]
    pub fn with_admin_route(mut self, route: impl Into<String>) -> Self {
        self.admin_route = route.into();
        self
    }

    /// Override the navigation delay.
    #[must_use]
    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            target: TargetDigest::placeholder(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            admin_route: DEFAULT_ADMIN_ROUTE.to_string(),
            navigation_delay: DEFAULT_NAVIGATION_DELAY,
        }
    }
}
