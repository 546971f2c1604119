//! Sessions
//!
//! Per-invocation working directories and the history they accumulate in.

pub mod history;
pub mod workdir;

pub use workdir::{Session, SessionDirectory, SessionName};
