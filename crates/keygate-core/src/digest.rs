//! Digest matching.
//!
//! The gate never holds the passphrase itself. It holds the SHA-256 digest
//! of the passphrase and compares that against the digest of the whole
//! current window. Matching is all-or-nothing: the window must equal the
//! passphrase exactly, so a passphrase longer than the window capacity can
//! never be typed in.
//!
//! # Security
//!
//! - Constant time: digests are compared with `subtle::ConstantTimeEq`.
//! - Debug redaction: `TargetDigest`'s `Debug` impl never prints the digest.
//! - Placeholder: a gate started without a configured digest uses a
//!   placeholder that is rejected before any comparison happens.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ConfigError;

/// Length of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// The digest a window must hash to in order to unlock the gate.
#[derive(Clone, PartialEq, Eq)]
pub struct TargetDigest {
    bytes: [u8; DIGEST_LEN],
    placeholder: bool,
}

impl TargetDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self { bytes, placeholder: false }
    }

    /// Parse a hex-encoded SHA-256 digest.
    ///
    /// Surrounding whitespace is ignored; case is not significant.
    pub fn from_hex(encoded: &str) -> Result<Self, ConfigError> {
        let decoded = hex::decode(encoded.trim())?;
        let actual = decoded.len();
        let bytes: [u8; DIGEST_LEN] = decoded
            .try_into()
            .map_err(|_| ConfigError::InvalidLength { expected: DIGEST_LEN, actual })?;

        Ok(Self::from_bytes(bytes))
    }

    /// Digest of `passphrase`. Mostly useful in tests and tooling.
    pub fn of(passphrase: &str) -> Self {
        Self::from_bytes(sha256(passphrase))
    }

    /// Placeholder used when no secret is configured. Never matches.
    pub fn placeholder() -> Self {
        Self { bytes: [0u8; DIGEST_LEN], placeholder: true }
    }

    /// Resolve an optional configured value, falling back to the placeholder.
    ///
    /// An absent or blank value yields the placeholder. A present but
    /// malformed value is an error rather than a silent fallback.
    pub fn resolve(configured: Option<&str>) -> Result<Self, ConfigError> {
        match configured.map(str::trim) {
            None | Some("") => {
                tracing::warn!("no target digest configured; keystroke login is disabled");
                Ok(Self::placeholder())
            },
            Some(encoded) => Self::from_hex(encoded),
        }
    }

    /// Whether this is the never-matching placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Hex encoding of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl std::fmt::Debug for TargetDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetDigest")
            .field("bytes", &"<redacted>")
            .field("placeholder", &self.placeholder)
            .finish()
    }
}

/// SHA-256 of a string's UTF-8 bytes.
pub fn sha256(input: &str) -> [u8; DIGEST_LEN] {
    Sha256::digest(input.as_bytes()).into()
}

/// Hex-encoded SHA-256 of a string, in the format `TargetDigest::from_hex`
/// accepts.
pub fn digest_hex(input: &str) -> String {
    hex::encode(sha256(input))
}

/// Whether `window` hashes to `target`.
///
/// Hashes the entire window; this is not a substring search.
pub fn matches(window: &str, target: &TargetDigest) -> bool {
    if target.placeholder {
        return false;
    }

    let digest = sha256(window);
    bool::from(digest.as_slice().ct_eq(target.bytes.as_slice()))
}
