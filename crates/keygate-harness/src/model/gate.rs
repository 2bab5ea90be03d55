//! Model gate.
//!
//! Simplified gate that compares plaintext instead of digests and tracks
//! time as plain milliseconds. No hashing, no store trait, just the logical
//! state transitions.

use super::operation::{MODEL_SECRET, Operation};

/// Window capacity mirrored from the real gate.
const CAPACITY: usize = 20;

/// Navigation delay in milliseconds mirrored from the real gate.
const NAVIGATION_DELAY_MS: u64 = 500;

/// Observable state for oracle comparison.
///
/// This is the subset of gate state that can be read back from the real
/// controller and its store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Whether the admin session is active.
    pub authenticated: bool,
    /// Window contents.
    pub window: String,
    /// Whether the store holds the flag.
    pub persisted: bool,
    /// Whether the session has fallen back to memory.
    pub degraded: bool,
    /// Milliseconds at which the pending navigation is due.
    pub pending_due_ms: Option<u64>,
    /// Navigations performed so far.
    pub navigations: u32,
}

/// Reference model of the gate.
#[derive(Debug, Clone, Default)]
pub struct ModelGate {
    authenticated: bool,
    window: String,
    persisted: bool,
    degraded: bool,
    writes_failing: bool,
    on_admin_route: bool,
    pending_due_ms: Option<u64>,
    navigations: u32,
    now_ms: u64,
}

impl ModelGate {
    /// Fresh model with an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an operation.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Type { key } => self.type_key(key.to_char()),
            Operation::TypeInTextField { .. } => {},
            Operation::TypeSecret => MODEL_SECRET.chars().for_each(|c| self.type_key(c)),
            Operation::ForceLogin { correct } => {
                if *correct {
                    self.grant();
                }
            },
            Operation::Logout => self.logout(),
            Operation::AdvanceTime { millis } => self.advance(u64::from(*millis)),
            Operation::VisitRoute { admin } => self.on_admin_route = *admin,
            Operation::StoreWrites { failing } => self.writes_failing = *failing,
            Operation::Restart => self.restart(),
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            authenticated: self.authenticated,
            window: self.window.clone(),
            persisted: self.persisted,
            degraded: self.degraded,
            pending_due_ms: self.pending_due_ms,
            navigations: self.navigations,
        }
    }

    fn type_key(&mut self, key: char) {
        self.window.push(key);
        let excess = self.window.chars().count().saturating_sub(CAPACITY);
        if excess > 0 {
            self.window = self.window.chars().skip(excess).collect();
        }

        if !self.authenticated && self.window == MODEL_SECRET {
            self.window.clear();
            self.grant();
        }
    }

    fn grant(&mut self) {
        self.authenticated = true;
        self.write(true);

        if !self.on_admin_route {
            self.pending_due_ms = Some(self.now_ms + NAVIGATION_DELAY_MS);
        }
    }

    fn logout(&mut self) {
        if !self.authenticated {
            return;
        }

        self.authenticated = false;
        self.window.clear();
        self.write(false);
        self.pending_due_ms = None;
    }

    fn advance(&mut self, millis: u64) {
        self.now_ms += millis;

        if self.pending_due_ms.is_some_and(|due| self.now_ms >= due) {
            self.pending_due_ms = None;
            self.navigations += 1;
        }
    }

    fn restart(&mut self) {
        self.authenticated = self.persisted;
        self.window.clear();
        self.degraded = false;
        self.on_admin_route = false;
        self.pending_due_ms = None;
    }

    fn write(&mut self, value: bool) {
        if self.degraded {
            return;
        }

        if self.writes_failing {
            self.degraded = true;
            return;
        }

        self.persisted = value;
    }
}
