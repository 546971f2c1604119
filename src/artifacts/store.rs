/// Registry of the runtime artifacts embedded at build time
use crate::config::types::{Result, ScopeError};
use std::borrow::Cow;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

mod embedded {
    include!(concat!(env!("OUT_DIR"), "/embedded_artifacts.rs"));
}

/// The fixed set of files the loader needs at runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Loader executable that activates the library around a command
    Loader,
    /// Shared instrumentation library
    Library,
    /// Default configuration template
    ConfigTemplate,
    /// Protocol detection schema
    ProtocolSchema,
}

impl ArtifactKind {
    /// Deployment order
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Loader,
        ArtifactKind::Library,
        ArtifactKind::ConfigTemplate,
        ArtifactKind::ProtocolSchema,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Loader => "ldscope",
            Self::Library => "libscope.so",
            Self::ConfigTemplate => "scope.yml",
            Self::ProtocolSchema => "scope_protocol.yml",
        }
    }

    /// Permission bits of the deployed file
    pub fn mode(self) -> u32 {
        match self {
            Self::Loader | Self::Library => 0o755,
            Self::ConfigTemplate | Self::ProtocolSchema => 0o644,
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.file_name() == name)
    }
}

/// One deployable file: bytes plus the metadata used to detect staleness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub content: Cow<'static, [u8]>,
    /// Modification time the deployed copy is stamped with
    pub modified: SystemTime,
}

impl Artifact {
    pub fn new(
        kind: ArtifactKind,
        content: impl Into<Cow<'static, [u8]>>,
        modified: SystemTime,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            modified,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.file_name()
    }

    pub fn mode(&self) -> u32 {
        self.kind.mode()
    }
}

/// Read-only registry of artifacts, one per kind
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    artifacts: Vec<Artifact>,
}

impl ArtifactStore {
    /// Store holding exactly `artifacts`; a later entry replaces an earlier one of the same kind
    pub fn new(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        let mut store = Self {
            artifacts: Vec::new(),
        };
        for artifact in artifacts {
            store.artifacts.retain(|a| a.kind != artifact.kind);
            store.artifacts.push(artifact);
        }
        store
    }

    /// Artifacts compiled into this binary
    pub fn embedded() -> Self {
        Self::new(embedded::EMBEDDED.iter().filter_map(|(name, bytes, secs)| {
            let kind = ArtifactKind::from_file_name(name)?;
            Some(Artifact::new(
                kind,
                *bytes,
                UNIX_EPOCH + Duration::from_secs(*secs),
            ))
        }))
    }

    pub fn get(&self, kind: ArtifactKind) -> Result<&Artifact> {
        self.artifacts
            .iter()
            .find(|a| a.kind == kind)
            .ok_or_else(|| ScopeError::MissingArtifact(kind.file_name().to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }
}
