/// Launch orchestration
///
/// One launch runs strictly in this order: deploy artifacts, create the
/// session, write its config, build the child environment, start the
/// loader. Every path the child environment points at exists before the
/// loader starts.
use crate::artifacts::{deploy_all, ArtifactKind, ArtifactStore};
use crate::config::settings::ScopeSettings;
use crate::config::types::{
    LaunchMode, Result, ScopeError, ENV_CMD_DIR, ENV_CONF_PATH, ENV_EXEC_PATH, ENV_LIB_PATH,
    ENV_METRIC_DEST,
};
use crate::exec::loader::{self, LoaderInvocation};
use crate::session::{Session, SessionDirectory};
use crate::telemetry::ConfigDocument;
use crate::utils::env_hygiene::Environment;
use std::convert::Infallible;
use std::path::PathBuf;
use std::process::Command;
use std::time::SystemTime;

/// A fully prepared launch: artifacts deployed, session populated
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub mode: LaunchMode,
    pub invocation: LoaderInvocation,
    /// Present for managed launches only
    pub session: Option<Session>,
}

impl LaunchPlan {
    pub fn env(&self) -> &Environment {
        &self.invocation.env
    }

    pub fn command(&self) -> Command {
        self.invocation.command()
    }
}

/// Result of a launch that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Exit code of the wrapped command (128 + signal when killed)
    pub exit_code: i32,
    pub signal: Option<i32>,
    pub session_root: Option<PathBuf>,
}

impl LaunchOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands under the deployed loader
pub struct Launcher {
    settings: ScopeSettings,
    store: ArtifactStore,
    clock: fn() -> SystemTime,
}

impl Launcher {
    pub fn new(settings: ScopeSettings, store: ArtifactStore) -> Self {
        Self {
            settings,
            store,
            clock: SystemTime::now,
        }
    }

    /// Time source for session nonces
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ScopeSettings {
        &self.settings
    }

    /// Do all setup for launching `argv` without starting anything
    pub fn prepare(
        &self,
        argv: &[String],
        mode: LaunchMode,
        inherited: &Environment,
    ) -> Result<LaunchPlan> {
        if argv.is_empty() {
            return Err(ScopeError::Config("Empty command provided".to_string()));
        }

        let deploy_dir = self.settings.deploy_dir();
        let report = deploy_all(&self.store, deploy_dir)?;
        log::debug!(
            "Artifacts in {} ready ({} written)",
            deploy_dir.display(),
            report.written()
        );

        let loader_path = deploy_dir.join(ArtifactKind::Loader.file_name());
        let library_path = deploy_dir.join(ArtifactKind::Library.file_name());

        let (env, session) = match mode {
            LaunchMode::Passthrough => {
                let env = inherited
                    .clone()
                    .set(ENV_METRIC_DEST, &self.settings.metric_dest);
                (env, None)
            }
            LaunchMode::Managed => {
                let sessions =
                    SessionDirectory::new(&self.settings.history_dir, self.settings.test_mode);
                let session = sessions.create(argv, (self.clock)())?;

                ConfigDocument::for_session(&session, self.settings.verbosity)
                    .write_to(&session.config_path())?;

                let env = inherited
                    .sanitized()
                    .with_var(ENV_EXEC_PATH, &loader_path)
                    .with_var(ENV_LIB_PATH, &library_path)
                    .with_var(ENV_CONF_PATH, session.config_path())
                    .with_var(ENV_CMD_DIR, session.cmd_dir());
                (env, Some(session))
            }
        };

        log::info!(
            "Prepared {:?} launch of {:?}{}",
            mode,
            argv,
            session
                .as_ref()
                .map(|s| format!(" in {}", s.root().display()))
                .unwrap_or_default()
        );

        Ok(LaunchPlan {
            mode,
            invocation: LoaderInvocation {
                loader: loader_path,
                argv: argv.to_vec(),
                env,
            },
            session,
        })
    }

    /// Prepare, spawn and wait; the wrapped command's exit code is returned, not raised
    pub fn run(
        &self,
        argv: &[String],
        mode: LaunchMode,
        inherited: &Environment,
    ) -> Result<LaunchOutcome> {
        let plan = self.prepare(argv, mode, inherited)?;
        let status = plan.invocation.spawn_and_wait()?;

        let outcome = LaunchOutcome {
            exit_code: loader::exit_code(&status),
            signal: std::os::unix::process::ExitStatusExt::signal(&status),
            session_root: plan.session.map(|s| s.root().to_path_buf()),
        };
        log::info!("Command exited with {}", outcome.exit_code);
        Ok(outcome)
    }

    /// Prepare and replace the current process with the loader
    ///
    /// Returns only on failure.
    pub fn exec(
        &self,
        argv: &[String],
        mode: LaunchMode,
        inherited: &Environment,
    ) -> Result<Infallible> {
        let plan = self.prepare(argv, mode, inherited)?;
        plan.invocation.exec()
    }
}
