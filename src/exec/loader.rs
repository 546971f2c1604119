/// Running commands under the deployed loader
use crate::config::types::{Result, ScopeError};
use crate::utils::env_hygiene::Environment;
use std::convert::Infallible;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// argv[0] the loader is started with
pub const LOADER_ARGV0: &str = "ldscope";

/// Everything needed to start the loader around one command
#[derive(Debug, Clone)]
pub struct LoaderInvocation {
    pub loader: PathBuf,
    /// Wrapped command, passed through after the loader's own argv[0]
    pub argv: Vec<String>,
    /// Complete child environment; nothing is inherited implicitly
    pub env: Environment,
}

impl LoaderInvocation {
    /// `Command` with a cleared environment replaced by `env`
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.loader);
        cmd.arg0(LOADER_ARGV0)
            .args(&self.argv)
            .env_clear()
            .envs(self.env.iter());
        cmd
    }

    /// Spawn the loader and wait for it, forwarding the standard streams
    pub fn spawn_and_wait(&self) -> Result<ExitStatus> {
        log::info!("Spawning {} for {:?}", self.loader.display(), self.argv);
        let mut child = self
            .command()
            .spawn()
            .map_err(|e| ScopeError::launch(&self.loader, e))?;
        child.wait().map_err(|e| ScopeError::launch(&self.loader, e))
    }

    /// Replace the current process image with the loader
    ///
    /// Returns only when `execve` fails.
    pub fn exec(&self) -> Result<Infallible> {
        let path = c_string(self.loader.as_os_str().as_bytes(), &self.loader)?;

        let mut argv = Vec::with_capacity(self.argv.len() + 1);
        argv.push(c_string(LOADER_ARGV0.as_bytes(), &self.loader)?);
        for arg in &self.argv {
            argv.push(c_string(arg.as_bytes(), &self.loader)?);
        }
        let envp = self.env.to_exec_env()?;

        log::info!("Executing {} via execve: {:?}", self.loader.display(), self.argv);
        nix::unistd::execve(&path, &argv, &envp)
            .map_err(|errno| ScopeError::launch(&self.loader, std::io::Error::from(errno)))
    }
}

fn c_string(bytes: &[u8], loader: &Path) -> Result<CString> {
    CString::new(bytes).map_err(|_| {
        ScopeError::Config(format!(
            "argument for {} contains a NUL byte",
            loader.display()
        ))
    })
}

/// Exit code a shell would report: the status code, or 128 + signal
pub fn exit_code(status: &ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(sig)) => 128 + sig,
        (None, None) => 1,
    }
}
