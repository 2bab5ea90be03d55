//! Bounded keystroke window.
//!
//! Holds the most recent ambient keystrokes in insertion order. The window
//! never grows past [`WINDOW_CAPACITY`] characters; appending to a full
//! window drops the oldest character from the front.

use std::collections::VecDeque;

/// Maximum number of characters retained in the window.
pub const WINDOW_CAPACITY: usize = 20;

/// Number of trailing characters exposed through [`AccessState`].
///
/// [`AccessState`]: crate::AccessState
pub const RECENT_LEN: usize = 10;

/// Where a keystroke originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// Typed while no text field had focus. Feeds the window.
    Ambient,
    /// Typed into a focused text field. Never touches the window.
    TextInput,
}

/// A single raw keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keystroke {
    /// Character produced by the key.
    pub key: char,
    /// Where the keystroke originated.
    pub source: InputSource,
}

impl Keystroke {
    /// Keystroke typed outside any text field.
    pub fn ambient(key: char) -> Self {
        Self { key, source: InputSource::Ambient }
    }

    /// Keystroke typed into a focused text field.
    pub fn text_input(key: char) -> Self {
        Self { key, source: InputSource::TextInput }
    }
}

/// Ordered, length-bounded window of recent keystrokes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyWindow {
    keys: VecDeque<char>,
}

impl KeyWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self { keys: VecDeque::with_capacity(WINDOW_CAPACITY) }
    }

    /// Feed one keystroke into the window.
    ///
    /// Text-input keystrokes are ignored. Returns `true` if the window was
    /// mutated, i.e. the keystroke was ambient.
    pub fn push(&mut self, keystroke: Keystroke) -> bool {
        if keystroke.source == InputSource::TextInput {
            return false;
        }

        self.keys.push_back(keystroke.key);
        while self.keys.len() > WINDOW_CAPACITY {
            self.keys.pop_front();
        }

        true
    }

    /// Current window contents, oldest first.
    pub fn contents(&self) -> String {
        self.keys.iter().collect()
    }

    /// The last `n` characters of the window (or all of them if fewer).
    pub fn recent(&self, n: usize) -> String {
        let skip = self.keys.len().saturating_sub(n);
        self.keys.iter().skip(skip).collect()
    }

    /// Number of characters currently held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the window holds no characters.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drop every character.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
