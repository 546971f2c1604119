//! Runtime artifacts
//!
//! The embedded artifact registry and its deployment onto disk.

pub mod deploy;
pub mod store;

pub use deploy::{deploy, deploy_all, DeployOutcome, DeployReport};
pub use store::{Artifact, ArtifactKind, ArtifactStore};
