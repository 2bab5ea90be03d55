//! Session persistence.
//!
//! The controller persists a single flag through the [`SessionStore`] trait.
//! Stores are injected, so tests substitute [`MemoryStore`] and the runtime
//! substitutes a file-backed store.
//!
//! # Invariants
//!
//! - Shared state: clones of a store observe each other's writes. A "restart"
//!   is modelled by handing a clone to a fresh controller.
//! - Absence is meaningful: `remove` must make the next `get` return `None`.

use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::error::StoreError;

/// Durable string key/value store.
pub trait SessionStore: Clone + Send + Sync + 'static {
    /// Read the value under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable { reason: "lock poisoned".to_string() }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }
}

/// Store wrapper that fails on demand.
///
/// Used to exercise the controller's degradation path. Reads and writes can
/// be broken independently; clones share the switches.
#[derive(Debug, Clone)]
pub struct ChaoticStore<S> {
    inner: S,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl<S: SessionStore> ChaoticStore<S> {
    /// Wrap `inner`. Starts healthy.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make `get` fail (or stop failing).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `set` and `remove` fail (or stop failing).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable { reason: "injected failure".to_string() });
        }
        Ok(())
    }
}

impl<S: SessionStore> SessionStore for ChaoticStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::check(&self.fail_reads)?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.remove(key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn get_absent_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn set_then_get() {
        let store = MemoryStore::new();
        store.set("flag", "true").unwrap();

        assert_eq!(store.get("flag").unwrap().as_deref(), Some("true"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_makes_key_absent() {
        let store = MemoryStore::new();
        store.set("flag", "true").unwrap();
        store.remove("flag").unwrap();

        assert_eq!(store.get("flag").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn remove_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("missing").is_ok());
    }

    #[test]
    fn clones_share_state() {
        let store1 = MemoryStore::new();
        let store2 = store1.clone();

        store1.set("flag", "true").unwrap();

        assert_eq!(store2.get("flag").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn chaotic_store_injects_failures() {
        let store = ChaoticStore::new(MemoryStore::new());
        store.set("flag", "true").unwrap();

        store.set_fail_reads(true);
        assert!(matches!(store.get("flag"), Err(StoreError::Unavailable { .. })));

        store.set_fail_reads(false);
        store.set_fail_writes(true);
        assert!(store.get("flag").is_ok());
        assert!(store.set("flag", "false").is_err());
        assert!(store.remove("flag").is_err());

        assert_eq!(store.inner().get("flag").unwrap().as_deref(), Some("true"));
    }
}
