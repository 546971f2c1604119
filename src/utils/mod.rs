//! Utilities
//!
//! Cross-cutting helpers for environment hygiene.

pub mod env_hygiene;
