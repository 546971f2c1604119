//! Execution control
//!
//! Prepares launches and starts the loader around the wrapped command.

pub mod launcher;
pub mod loader;

pub use launcher::{LaunchOutcome, LaunchPlan, Launcher};
