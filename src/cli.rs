use crate::artifacts::{deploy_all, ArtifactStore, DeployOutcome};
use crate::config::settings::ScopeSettings;
use crate::config::types::{LaunchMode, ScopeError, DEFAULT_VERBOSITY, ENV_HOME};
use crate::exec::Launcher;
use crate::session::history::{self, HistoryEntry};
use crate::utils::env_hygiene::Environment;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run commands under the scope loader", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a command under the loader
    Run {
        /// Inherit the environment unchanged and skip session creation
        #[arg(long)]
        passthrough: bool,
        /// Metric verbosity written into the session config (0-9)
        #[arg(
            long,
            default_value_t = DEFAULT_VERBOSITY,
            value_parser = clap::value_parser!(u8).range(0..=9)
        )]
        verbosity: u8,
        /// Scope home directory (overrides SCOPE_HOME)
        #[arg(long, value_name = "DIR")]
        home: Option<PathBuf>,
        /// Command and arguments to execute
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Deploy the embedded artifacts into a directory
    Extract {
        /// Target directory, created if missing
        dir: PathBuf,
    },
    /// List recorded sessions
    History {
        /// Only show sessions of this command
        #[arg(long, value_name = "NAME")]
        command: Option<String>,
        /// Scope home directory (overrides SCOPE_HOME)
        #[arg(long, value_name = "DIR")]
        home: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    // The process environment is read exactly once, here.
    let env = Environment::capture();

    match cli.command {
        Commands::Run {
            passthrough,
            verbosity,
            home,
            command,
        } => {
            let mode = if passthrough {
                LaunchMode::Passthrough
            } else {
                LaunchMode::Managed
            };
            let err = match resolve_settings(&env, home) {
                Ok(settings) => {
                    let launcher =
                        Launcher::new(settings.verbosity(verbosity), ArtifactStore::embedded());
                    match launcher.exec(&command, mode, &env) {
                        Ok(never) => match never {},
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };
            report_failure(&err);
            std::process::exit(err.exit_code());
        }
        Commands::Extract { dir } => {
            let report = deploy_all(&ArtifactStore::embedded(), &dir)
                .with_context(|| format!("Failed to extract artifacts to {}", dir.display()))?;
            for (_, path, outcome) in &report.entries {
                println!("{:<9} {}", outcome_label(*outcome), path.display());
            }
        }
        Commands::History { command, home } => {
            let settings = resolve_settings(&env, home)?;
            let entries = history::list_sessions(&settings.history_dir)?;
            let entries: Vec<&HistoryEntry> = entries
                .iter()
                .filter(|entry| command.as_deref().map_or(true, |c| entry.name.command == c))
                .collect();

            if entries.is_empty() {
                eprintln!("No sessions in {}", settings.history_dir.display());
                return Ok(());
            }
            println!(
                "{:<20} {:>7} {:>8} {:<19} PATH",
                "COMMAND", "COUNTER", "PID", "CREATED"
            );
            for entry in entries {
                println!(
                    "{:<20} {:>7} {:>8} {:<19} {}",
                    entry.name.command,
                    entry.name.counter,
                    entry.name.pid,
                    format_time(entry),
                    entry.path.display()
                );
            }
        }
    }

    Ok(())
}

/// Settings from the captured environment, with `--home` taking precedence
fn resolve_settings(
    env: &Environment,
    home: Option<PathBuf>,
) -> crate::config::types::Result<ScopeSettings> {
    match home {
        Some(home) => ScopeSettings::from_environment(&env.clone().with_var(ENV_HOME, home)),
        None => ScopeSettings::from_environment(env),
    }
}

fn report_failure(err: &ScopeError) {
    if err.is_setup_failure() {
        eprintln!("scoperun: setup failed: {}", err);
    } else {
        eprintln!("scoperun: launch failed: {}", err);
    }
}

fn outcome_label(outcome: DeployOutcome) -> &'static str {
    match outcome {
        DeployOutcome::Written => "written",
        DeployOutcome::Refreshed => "refreshed",
        DeployOutcome::Cached => "cached",
    }
}

fn format_time(entry: &HistoryEntry) -> String {
    entry
        .created
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
