/// Launcher settings resolved from an explicit environment
use crate::config::types::{
    Result, ScopeError, DEFAULT_METRIC_DEST, DEFAULT_VERBOSITY, ENV_HOME, ENV_METRIC_DEST,
    ENV_TEST,
};
use crate::utils::env_hygiene::Environment;
use std::path::{Path, PathBuf};

/// Name of the history directory under the scope home
const HISTORY_DIR: &str = "history";

/// Where artifacts and sessions live, and how sessions are configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSettings {
    /// Scope home; artifacts are deployed here
    pub home: PathBuf,
    /// Root directory holding one subdirectory per session
    pub history_dir: PathBuf,
    /// Append a time nonce to session names
    pub test_mode: bool,
    /// Metric verbosity written into session configs
    pub verbosity: u8,
    /// Destination override injected into passthrough launches
    pub metric_dest: String,
}

impl ScopeSettings {
    /// Settings rooted at `home` with defaults for everything else
    pub fn with_home(home: impl AsRef<Path>) -> Result<Self> {
        let home = absolutize(home.as_ref())?;
        Ok(Self {
            history_dir: home.join(HISTORY_DIR),
            home,
            test_mode: false,
            verbosity: DEFAULT_VERBOSITY,
            metric_dest: DEFAULT_METRIC_DEST.to_string(),
        })
    }

    /// Resolve settings from `SCOPE_HOME`, `HOME`, `SCOPE_TEST` and `SCOPE_METRIC_DEST`
    pub fn from_environment(env: &Environment) -> Result<Self> {
        let home = match env.get_str(ENV_HOME) {
            Some(home) => PathBuf::from(home),
            None => env
                .get_str("HOME")
                .map(|h| Path::new(h).join(".scope"))
                .ok_or_else(|| {
                    ScopeError::Config(format!("neither {} nor HOME is set", ENV_HOME))
                })?,
        };

        let mut settings = Self::with_home(home)?;
        settings.test_mode = env.get_str(ENV_TEST).is_some();
        if let Some(dest) = env.get_str(ENV_METRIC_DEST) {
            settings.metric_dest = dest.to_string();
        }

        log::debug!(
            "Resolved scope home {} (test mode: {})",
            settings.home.display(),
            settings.test_mode
        );
        Ok(settings)
    }

    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    /// Directory the artifact set is deployed into
    pub fn deploy_dir(&self) -> &Path {
        &self.home
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| ScopeError::Config(format!("Failed to get current directory: {}", e)))?;
    Ok(cwd.join(path))
}
