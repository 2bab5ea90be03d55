//! Runtime error types.

use keygate_core::{ConfigError, StoreError};
use thiserror::Error;

/// Errors that can occur in the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Terminal or stream I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frontend refused a navigation
    #[error("navigation to {route} failed: {reason}")]
    Navigation {
        /// Route that could not be reached
        route: String,
        /// Why navigation failed
        reason: String,
    },

    /// A session change happened in memory but never reached the store
    #[error("session change for {key} was not persisted")]
    NotPersisted {
        /// Storage key that could not be written
        key: String,
    },
}
