//! Telemetry configuration
//!
//! Builds the per-session `scope.yml` and writes it in the exact layout
//! libscope expects.

pub mod document;
pub mod yaml;

pub use document::ConfigDocument;
