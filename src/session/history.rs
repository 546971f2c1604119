/// Session history under the history root
use crate::config::types::{Result, ScopeError};
use crate::session::workdir::{SessionName, ARGS_FILE};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A session directory found on disk
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub name: SessionName,
    pub path: PathBuf,
    /// When the session was created, taken from its write-once `args.json`
    pub created: Option<SystemTime>,
}

/// Counter for the next session of `command`
///
/// The smallest positive counter not used by any existing session directory
/// of that command, whatever its pid. An unreadable history root counts as
/// empty: the session is about to be created there anyway and that step
/// reports real failures.
pub fn next_counter(history_root: &Path, command: &str) -> u32 {
    let entries = match fs::read_dir(history_root) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "Cannot read history root {}: {}; assuming no prior sessions",
                    history_root.display(),
                    e
                );
            }
            return 1;
        }
    };

    let taken: BTreeSet<u32> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let file_name = entry.file_name();
            SessionName::parse_for(command, file_name.to_str()?)
        })
        .map(|name| name.counter)
        .collect();

    (1..=u32::MAX)
        .find(|n| !taken.contains(n))
        .unwrap_or(u32::MAX)
}

/// All session directories under `history_root`, ordered by command then counter
///
/// A missing history root yields an empty list.
pub fn list_sessions(history_root: &Path) -> Result<Vec<HistoryEntry>> {
    let entries = match fs::read_dir(history_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ScopeError::session(history_root, e)),
    };

    let mut sessions = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Failed to read history entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().and_then(SessionName::parse) else {
            log::debug!("Skipping non-session entry {}", path.display());
            continue;
        };

        let created = fs::metadata(path.join(ARGS_FILE))
            .and_then(|m| m.modified())
            .ok();
        sessions.push(HistoryEntry {
            name,
            path,
            created,
        });
    }

    sessions.sort_by(|a, b| {
        a.name
            .command
            .cmp(&b.name.command)
            .then(a.name.counter.cmp(&b.name.counter))
            .then(a.name.pid.cmp(&b.name.pid))
    });
    Ok(sessions)
}
