//! Keygate production runtime.
//!
//! This crate drives the sans-IO [`keygate_core::AccessController`] using:
//! - Tokio for the driver loop and navigation deadlines
//! - A CBOR session file for persistence across restarts
//! - A keyboard hub handing out scoped keystroke subscriptions
//!
//! ## Architecture
//!
//! ```text
//! keygate-runtime
//!   ├─ SystemEnv          (production Environment impl)
//!   ├─ FileStore          (CBOR session file, atomic rename)
//!   ├─ KeyboardHub        (keystroke fan-out, RAII subscriptions)
//!   └─ GateDriver         (executes controller actions on a Frontend)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod file_store;
mod hub;
mod system_env;

use std::{path::PathBuf, time::Duration};

pub use driver::{DriverCommand, Frontend, GateDriver};
pub use error::RuntimeError;
pub use file_store::FileStore;
pub use hub::{KeyboardHub, KeystrokeSubscription};
use keygate_core::{AccessController, GateConfig, StatusView, TargetDigest};
pub use system_env::SystemEnv;

/// Default location of the session file.
pub const DEFAULT_STATE_FILE: &str = ".keygate/session.cbor";

/// Configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Hex-encoded target digest; `None` or blank disables the gate
    pub target_digest: Option<String>,
    /// Session file path
    pub state_file: PathBuf,
    /// Storage key for the authenticated flag
    pub storage_key: String,
    /// Route navigated to after login
    pub admin_route: String,
    /// Delay between login and navigation
    pub navigation_delay: Duration,
    /// Render the debug status line
    pub debug_status: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let gate = GateConfig::default();
        Self {
            target_digest: None,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            storage_key: gate.storage_key,
            admin_route: gate.admin_route,
            navigation_delay: gate.navigation_delay,
            debug_status: false,
        }
    }
}

impl RuntimeConfig {
    /// Resolve the target digest and build the core configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if the digest is set but is not 64
    /// hex characters.
    pub fn gate_config(&self) -> Result<GateConfig, RuntimeError> {
        let target = TargetDigest::resolve(self.target_digest.as_deref())?;

        Ok(GateConfig::new(target)
            .with_storage_key(self.storage_key.clone())
            .with_admin_route(self.admin_route.clone())
            .with_navigation_delay(self.navigation_delay))
    }

    /// Session store at the configured path.
    pub fn store(&self) -> FileStore {
        FileStore::new(&self.state_file)
    }

    /// Status view honouring the debug flag.
    pub fn status_view(&self) -> StatusView {
        StatusView::new(self.debug_status)
    }

    /// Controller over the file store, restoring any persisted session.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] on a malformed target digest.
    pub fn controller(&self) -> Result<AccessController<SystemEnv, FileStore>, RuntimeError> {
        Ok(AccessController::new(SystemEnv::new(), self.store(), self.gate_config()?))
    }

    /// Log in once against the session file. Returns whether the password
    /// matched.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotPersisted`] if the password matched but the
    /// session could not be written, and [`RuntimeError::Config`] on a
    /// malformed target digest.
    pub fn login_once(&self, password: &str) -> Result<bool, RuntimeError> {
        let mut controller = self.controller()?;
        if !controller.force_login(password).accepted {
            return Ok(false);
        }

        self.ensure_persisted(&controller)?;
        Ok(true)
    }

    /// End the persisted session once. Returns whether one was active.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotPersisted`] if the session was active but
    /// the flag could not be removed, and [`RuntimeError::Config`] on a
    /// malformed target digest.
    pub fn logout_once(&self) -> Result<bool, RuntimeError> {
        let mut controller = self.controller()?;
        if !controller.is_authenticated() {
            return Ok(false);
        }

        controller.logout();
        self.ensure_persisted(&controller)?;
        Ok(true)
    }

    fn ensure_persisted(
        &self,
        controller: &AccessController<SystemEnv, FileStore>,
    ) -> Result<(), RuntimeError> {
        if controller.is_degraded() {
            return Err(RuntimeError::NotPersisted { key: self.storage_key.clone() });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keygate_core::digest;

    use super::*;

    #[test]
    fn default_config_uses_placeholder() {
        let gate = RuntimeConfig::default().gate_config().unwrap();

        assert!(gate.target.is_placeholder());
        assert_eq!(gate.admin_route, "/admin");
    }

    #[test]
    fn malformed_digest_is_rejected() {
        let config =
            RuntimeConfig { target_digest: Some("not-hex".to_string()), ..RuntimeConfig::default() };

        assert!(matches!(config.gate_config(), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn controller_restores_persisted_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig {
            target_digest: Some(digest::digest_hex("letmein")),
            state_file: dir.path().join("session.cbor"),
            ..RuntimeConfig::default()
        };

        let mut first = config.controller().unwrap();
        assert!(first.force_login("letmein").accepted);
        drop(first);

        let second = config.controller().unwrap();
        assert!(second.is_authenticated());
    }

    fn config_in(dir: &tempfile::TempDir) -> RuntimeConfig {
        RuntimeConfig {
            target_digest: Some(digest::digest_hex("letmein")),
            state_file: dir.path().join("session.cbor"),
            ..RuntimeConfig::default()
        }
    }

    fn block_writes(dir: &tempfile::TempDir) {
        std::fs::create_dir(dir.path().join("session.cbor.tmp")).unwrap();
    }

    #[test]
    fn one_shot_login_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        assert!(!config.login_once("nope").unwrap());
        assert!(config.login_once("letmein").unwrap());
        assert!(config.controller().unwrap().is_authenticated());

        assert!(config.logout_once().unwrap());
        assert!(!config.logout_once().unwrap());
        assert!(!config.controller().unwrap().is_authenticated());
    }

    #[test]
    fn one_shot_login_reports_unwritten_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        block_writes(&dir);

        let result = config.login_once("letmein");

        assert!(matches!(
            result,
            Err(RuntimeError::NotPersisted { ref key }) if key == "admin_authenticated"
        ));
        assert!(!dir.path().join("session.cbor").exists());
    }

    #[test]
    fn one_shot_logout_reports_unremoved_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        assert!(config.login_once("letmein").unwrap());
        block_writes(&dir);

        let result = config.logout_once();

        assert!(matches!(result, Err(RuntimeError::NotPersisted { .. })));
        assert_eq!(
            keygate_core::SessionStore::get(&config.store(), "admin_authenticated").unwrap(),
            Some("true".to_string())
        );
    }
}
