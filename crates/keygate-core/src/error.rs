//! Error types.
//!
//! The controller itself never returns errors to its callers: digest
//! mismatches are silent and storage failures degrade the session to memory.
//! These types surface at the edges, from store implementations and from
//! configuration parsing.

use thiserror::Error;

/// Errors from session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached at all.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Why the store is unavailable.
        reason: String,
    },

    /// Reading or writing the backing medium failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data could not be decoded.
    #[error("store data corrupt: {reason}")]
    Corrupt {
        /// Description of the decoding failure.
        reason: String,
    },
}

impl StoreError {
    /// Returns true if retrying the operation later might succeed.
    ///
    /// Corrupt data stays corrupt until something rewrites it.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable { .. } | Self::Io(_) => true,
            Self::Corrupt { .. } => false,
        }
    }
}

/// Errors from parsing gate configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Target digest is not valid hex.
    #[error("target digest is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Target digest decoded to the wrong number of bytes.
    #[error("target digest has wrong length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required digest length in bytes.
        expected: usize,
        /// Decoded length in bytes.
        actual: usize,
    },
}
