//! The per-image solving pipeline.
//!
//! This module contains the stages an image moves through in a batch run:
//! - **discovery**: Expand positional arguments into an ordered image list
//! - **stage**: The per-image state machine (skip-check, load, solve,
//!   extract, report) with isolated failure handling
//!
//! The batch loop that drives one stage per image lives in `crate::driver`.

pub mod discovery;
pub mod stage;

// Re-exports for convenient access
pub use discovery::expand_inputs;
pub use stage::{ImageOutcome, ImagePipeline, RunContext};
