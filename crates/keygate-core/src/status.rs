//! Debug status indicator.
//!
//! Pure rendering of an [`AccessState`]. Whether anything is shown at all is
//! decided by the flag passed at construction, not by sniffing the build.

use crate::event::AccessState;

/// One-line debug indicator for the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusView {
    visible: bool,
}

impl StatusView {
    /// Create a view; `visible` is typically true only in development.
    pub fn new(visible: bool) -> Self {
        Self { visible }
    }

    /// Whether the view renders anything.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Render `state`, or `None` when hidden.
    pub fn render(&self, state: &AccessState) -> Option<String> {
        if !self.visible {
            return None;
        }

        let mode = if state.authenticated { "ADMIN" } else { "locked" };
        let window: String =
            state.recent_window.chars().map(|c| if c.is_control() { '·' } else { c }).collect();

        Some(format!("[gate: {mode}] keys: \"{window}\""))
    }
}
