/// Artifact deployment with timestamp-based reuse
///
/// A deployed file is stamped with its artifact's declared modification time.
/// As long as the two match, later deployments leave the file alone; any
/// difference means the copy is stale and it is rewritten and re-stamped.
/// There is no locking: concurrent deployers write identical bytes and
/// converge on the same timestamp.
use crate::artifacts::store::{Artifact, ArtifactKind, ArtifactStore};
use crate::config::types::{Result, ScopeError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Permissions for a deployment directory created on demand
const DEPLOY_DIR_MODE: u32 = 0o755;

/// What a single deployment did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployOutcome {
    /// File did not exist and was written
    Written,
    /// File existed with a different timestamp and was rewritten
    Refreshed,
    /// File was current; nothing was written
    Cached,
}

/// Result of deploying the full artifact set
#[derive(Debug, Clone, Default)]
pub struct DeployReport {
    pub entries: Vec<(ArtifactKind, PathBuf, DeployOutcome)>,
}

impl DeployReport {
    /// Number of files actually written
    pub fn written(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, _, outcome)| *outcome != DeployOutcome::Cached)
            .count()
    }

    pub fn path_of(&self, kind: ArtifactKind) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, path, _)| path.as_path())
    }
}

/// Make sure `target_dir/<artifact name>` holds the artifact
pub fn deploy(artifact: &Artifact, target_dir: &Path) -> Result<DeployOutcome> {
    ensure_dir(target_dir)?;
    let path = target_dir.join(artifact.name());

    let outcome = match fs::metadata(&path) {
        Ok(meta) if !meta.is_file() => {
            return Err(ScopeError::deploy(
                &path,
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "path exists and is not a regular file",
                ),
            ));
        }
        Ok(meta) => {
            let current = meta.modified().map_err(|e| ScopeError::deploy(&path, e))?;
            if current == artifact.modified {
                log::debug!("{} is current, skipping write", path.display());
                return Ok(DeployOutcome::Cached);
            }
            DeployOutcome::Refreshed
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DeployOutcome::Written,
        Err(e) => return Err(ScopeError::deploy(&path, e)),
    };

    write_artifact(artifact, &path)?;
    log::info!(
        "Deployed {} ({} bytes, {:?})",
        path.display(),
        artifact.content.len(),
        outcome
    );
    Ok(outcome)
}

/// Deploy loader, library, config template and protocol schema, in that order
///
/// Stops at the first failure. Files deployed before the failure stay in
/// place; the next call repairs the rest.
pub fn deploy_all(store: &ArtifactStore, target_dir: &Path) -> Result<DeployReport> {
    let mut report = DeployReport::default();
    for kind in ArtifactKind::ALL {
        let artifact = store.get(kind)?;
        let outcome = deploy(artifact, target_dir)?;
        report
            .entries
            .push((kind, target_dir.join(artifact.name()), outcome));
    }
    Ok(report)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .recursive(true)
        .mode(DEPLOY_DIR_MODE)
        .create(dir)
        .map_err(|e| ScopeError::deploy(dir, e))
}

fn write_artifact(artifact: &Artifact, path: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| ScopeError::deploy(path, e))?;

    file.write_all(&artifact.content)
        .map_err(|e| ScopeError::deploy(path, e))?;

    // Explicit chmod so the process umask never changes the deployed mode.
    file.set_permissions(fs::Permissions::from_mode(artifact.mode()))
        .map_err(|e| ScopeError::deploy(path, e))?;

    file.set_modified(artifact.modified)
        .map_err(|e| ScopeError::deploy(path, e))?;

    Ok(())
}
