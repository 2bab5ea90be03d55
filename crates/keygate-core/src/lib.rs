//! Keygate Core
//!
//! Action-based state machine for a hidden, keystroke-triggered admin gate.
//! Ambient keystrokes accumulate in a bounded window; when the SHA-256 digest
//! of the whole window equals the configured target digest the gate enters
//! the admin session, persists it and asks its driver to navigate to the
//! admin route.
//!
//! # Architecture
//!
//! The controller is a pure state machine that:
//! - Receives events from the caller (keystrokes, ticks, logout, route and
//!   permission updates)
//! - Produces actions for the caller to execute (notify, schedule or cancel
//!   navigation, navigate)
//! - Uses the `Environment` trait for time (deterministic testing)
//! - Persists through an injected `SessionStore`, degrading to memory when
//!   the store fails
//!
//! # Components
//!
//! - [`KeyWindow`]: Bounded window of recent ambient keystrokes
//! - [`digest::matches`]: Constant-time digest comparison of the window
//! - [`SessionStore`]: Persistence of the authenticated flag
//! - [`AccessController`]: Two-state session machine
//! - [`StatusView`]: Debug indicator rendered from [`AccessState`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod digest;
pub mod env;
pub mod error;
pub mod event;
pub mod status;
pub mod storage;
pub mod window;

pub use config::GateConfig;
pub use controller::{AccessController, ForceLoginResult};
pub use digest::TargetDigest;
pub use env::Environment;
pub use error::{ConfigError, StoreError};
pub use event::{
    AccessAction, AccessEvent, AccessState, LogLevel, NavigationTimer, NotificationPermission,
    SessionState,
};
pub use status::StatusView;
pub use storage::{ChaoticStore, MemoryStore, SessionStore};
pub use window::{InputSource, KeyWindow, Keystroke, RECENT_LEN, WINDOW_CAPACITY};
