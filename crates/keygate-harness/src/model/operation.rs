//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to a gate. They are
//! generated randomly by proptest and applied to both the model and the real
//! controller.

use arbitrary::Arbitrary;

/// Passphrase used by model-based tests.
///
/// Short and drawn from [`ALPHABET`] so that random typing hits it often.
pub const MODEL_SECRET: &str = "cab";

/// Characters random keystrokes are drawn from.
pub const ALPHABET: [char; 4] = ['a', 'b', 'c', 'd'];

/// A key drawn from [`ALPHABET`].
#[derive(Debug, Clone, Copy, Arbitrary)]
pub struct ModelKey(pub u8);

impl ModelKey {
    /// The character this key produces.
    pub fn to_char(self) -> char {
        ALPHABET[usize::from(self.0) % ALPHABET.len()]
    }
}

/// Operations that can be applied to the gate.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// One ambient keystroke.
    Type {
        /// Key pressed.
        key: ModelKey,
    },

    /// One keystroke into a focused text field.
    TypeInTextField {
        /// Key pressed.
        key: ModelKey,
    },

    /// Type the whole secret ambiently.
    TypeSecret,

    /// Force login with the secret, or with a near miss.
    ForceLogin {
        /// Whether the correct password is used.
        correct: bool,
    },

    /// Log out.
    Logout,

    /// Advance simulation time and deliver a tick.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },

    /// The application navigated.
    VisitRoute {
        /// Whether the new route is the admin route.
        admin: bool,
    },

    /// Break or repair store writes.
    StoreWrites {
        /// Whether writes should fail.
        failing: bool,
    },

    /// Drop the controller and build a new one over the same store.
    Restart,
}
