//! Deterministic simulation harness for Keygate testing.
//!
//! Virtual-clock implementation of the `Environment` trait plus a seeded
//! typist, for reproducible tests of the access gate.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real controller,
//! and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;
pub mod typist;

pub use model::{ALPHABET, MODEL_SECRET, ModelGate, ModelKey, ObservableState, Operation};
pub use sim_env::{SimEnv, SimInstant};
pub use typist::Typist;
