//! Reference model for model-based testing.
//!
//! The model is a simplified gate that captures the intended behaviour
//! without digests or stores. It serves as the oracle against which the real
//! controller is verified.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Plaintext: The model compares the window to the secret directly
//! - Deterministic: Same inputs produce same outputs

mod gate;
pub mod operation;

pub use gate::{ModelGate, ObservableState};
pub use operation::{ALPHABET, MODEL_SECRET, ModelKey, Operation};
