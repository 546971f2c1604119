/// Core types shared across the scoperun crate
use std::path::PathBuf;
use thiserror::Error;

/// Reserved prefix for every environment variable scoperun reads, filters or injects
pub const RESERVED_ENV_PREFIX: &str = "SCOPE";

/// Scope home (artifact deployment directory) override
pub const ENV_HOME: &str = "SCOPE_HOME";
/// Test mode flag; any non-empty value appends a time nonce to session names
pub const ENV_TEST: &str = "SCOPE_TEST";
/// Metric destination override used by passthrough launches
pub const ENV_METRIC_DEST: &str = "SCOPE_METRIC_DEST";
/// Deployed loader path, injected into managed launches
pub const ENV_EXEC_PATH: &str = "SCOPE_EXEC_PATH";
/// Deployed instrumentation library path, injected into managed launches
pub const ENV_LIB_PATH: &str = "SCOPE_LIB_PATH";
/// Session configuration file, injected into managed launches
pub const ENV_CONF_PATH: &str = "SCOPE_CONF_PATH";
/// Session command directory, injected into managed launches
pub const ENV_CMD_DIR: &str = "SCOPE_CMD_DIR";

/// Default metric destination for passthrough launches
pub const DEFAULT_METRIC_DEST: &str = "file://stderr";
/// Default metric verbosity written into session configs
pub const DEFAULT_VERBOSITY: u8 = 4;

/// Exit status for failures before the loader was started
pub const EXIT_SETUP_FAILURE: i32 = 125;
/// Exit status when the loader exists but could not be executed
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
/// Exit status when the loader could not be found
pub const EXIT_NOT_FOUND: i32 = 127;

/// How a command is launched under the loader
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LaunchMode {
    /// Sanitized environment, dedicated session and generated config
    #[default]
    Managed,
    /// Caller's environment plus a metric destination override, no session
    Passthrough,
}

/// Result type for scoperun operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Error types for scoperun
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deployment error at {}: {source}", path.display())]
    Deploy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session error at {}: {source}", path.display())]
    Session {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing embedded artifact: {0}")]
    MissingArtifact(String),

    #[error("Launch error for {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScopeError {
    pub(crate) fn deploy(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScopeError::Deploy {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn session(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScopeError::Session {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn launch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScopeError::Launch {
            path: path.into(),
            source,
        }
    }

    /// True when the failure happened before the loader was started
    pub fn is_setup_failure(&self) -> bool {
        !matches!(self, ScopeError::Launch { .. })
    }

    /// Process exit status reported for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            ScopeError::Launch { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                EXIT_NOT_FOUND
            }
            ScopeError::Launch { .. } => EXIT_CANNOT_EXECUTE,
            _ => EXIT_SETUP_FAILURE,
        }
    }
}
