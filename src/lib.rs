//! scoperun: launch-session manager for the scope loader
//!
//! Deploys the embedded loader, library and configuration files, records
//! each managed launch in its own session directory and runs the command
//! under the loader.
//!
//! # Architecture
//!
//! ## Artifacts ([`artifacts`])
//! - [`artifacts::store`]: The embedded artifact set and its declared timestamps
//! - [`artifacts::deploy`]: Timestamp-checked deployment into the scope home
//!
//! ## Sessions ([`session`])
//! - [`session::workdir`]: Session naming and directory layout
//! - [`session::history`]: Counter derivation and history listing
//!
//! ## Telemetry configuration ([`telemetry`])
//! - [`telemetry::document`]: The per-session `scope.yml` document
//! - [`telemetry::yaml`]: Deterministic YAML rendering
//!
//! ## Execution ([`exec`])
//! - [`exec::launcher`]: deploy, session, config, then start the loader
//! - [`exec::loader`]: Loader invocation via spawn or `execve`
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: Error type, launch mode, environment names, exit codes
//! - [`config::settings`]: Settings resolved from an explicit environment
//!
//! ## Utilities ([`utils`])
//! - [`utils::env_hygiene`]: Explicit environment values and `SCOPE*` filtering
//!
//! # Design Principles
//!
//! 1. **Setup before launch** - Every path handed to the child exists first
//! 2. **No ambient state** - The process environment is read once and never mutated
//! 3. **Byte-stable output** - Session files are reproducible for a given session

// Embedded artifacts
pub mod artifacts;

// Session directories
pub mod session;

// Telemetry configuration
pub mod telemetry;

// Execution
pub mod exec;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the scoperun binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use artifacts::{ArtifactKind, ArtifactStore};
pub use config::settings::ScopeSettings;
pub use config::types::{LaunchMode, Result, ScopeError};
pub use exec::{LaunchOutcome, LaunchPlan, Launcher};
pub use session::{Session, SessionDirectory, SessionName};
pub use utils::env_hygiene::Environment;
