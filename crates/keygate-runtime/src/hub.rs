//! Keyboard hub.
//!
//! The hub is the process-wide keystroke source. Consumers do not listen to
//! it ambiently; they [`attach`](KeyboardHub::attach) and get back a
//! [`KeystrokeSubscription`]. Dropping the subscription (or calling
//! [`detach`](KeystrokeSubscription::detach)) deregisters it, so a consumer
//! torn down without cleanup cannot leak a listener or receive duplicates.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use keygate_core::Keystroke;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<Keystroke>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide keystroke fan-out.
///
/// Clones share the same subscriber list.
#[derive(Debug, Clone, Default)]
pub struct KeyboardHub {
    registry: Arc<Mutex<Registry>>,
}

impl KeyboardHub {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn attach(&self) -> KeystrokeSubscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, tx);
        drop(registry);

        tracing::debug!(subscription = id, "keystroke subscription attached");
        KeystrokeSubscription { id, registry: Arc::downgrade(&self.registry), receiver: rx }
    }

    /// Deliver a keystroke to every subscriber. Returns how many received it.
    pub fn publish(&self, keystroke: Keystroke) -> usize {
        let mut registry = lock(&self.registry);
        registry.subscribers.retain(|_, tx| tx.send(keystroke).is_ok());
        registry.subscribers.len()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

/// A consumer's registration with a [`KeyboardHub`].
///
/// Deregisters itself on drop.
#[derive(Debug)]
pub struct KeystrokeSubscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
    receiver: mpsc::UnboundedReceiver<Keystroke>,
}

impl KeystrokeSubscription {
    /// Wait for the next keystroke. `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Keystroke> {
        self.receiver.recv().await
    }

    /// Next keystroke if one is already queued.
    pub fn try_recv(&mut self) -> Option<Keystroke> {
        self.receiver.try_recv().ok()
    }

    /// Deregister explicitly.
    pub fn detach(self) {}
}

impl Drop for KeystrokeSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
            tracing::debug!(subscription = self.id, "keystroke subscription detached");
        }
    }
}
