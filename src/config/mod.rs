//! Configuration
//!
//! Shared types, error taxonomy and launcher settings.

pub mod settings;
pub mod types;
