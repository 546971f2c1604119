/// Session working directories
///
/// Every managed launch gets its own directory under the history root,
/// named `{command}_{counter}_{pid}` with an extra `_{nonce}` in test mode.
/// The pid keeps names from concurrent launchers apart without locking; the
/// counter tells repeated runs of the same command apart. Directories are
/// never removed here; history management owns their lifetime.
use crate::config::types::{Result, ScopeError};
use crate::session::history;
use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Permissions for the history root
const HISTORY_DIR_MODE: u32 = 0o755;
/// Permissions for a session directory and its subdirectories
const SESSION_DIR_MODE: u32 = 0o700;

pub const ARGS_FILE: &str = "args.json";
pub const CONFIG_FILE: &str = "scope.yml";
pub const CMD_DIR: &str = "cmd";
pub const PAYLOADS_DIR: &str = "payloads";

/// Identity of one session, as encoded in its directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionName {
    pub command: String,
    pub counter: u32,
    pub pid: u32,
    pub nonce: Option<u128>,
}

impl SessionName {
    /// Parse `{command}_{counter}_{pid}[_{nonce}]`
    ///
    /// The command itself may contain underscores, so the numeric fields are
    /// taken from the right.
    pub fn parse(dir_name: &str) -> Option<Self> {
        let parts: Vec<&str> = dir_name.split('_').collect();
        let numeric_tail = parts
            .iter()
            .rev()
            .take_while(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
            .count();

        // A command named like a number would make the split ambiguous;
        // the command keeps at least one part.
        let (command_parts, fields) = match numeric_tail.min(parts.len().saturating_sub(1)) {
            n if n >= 3 => parts.split_at(parts.len() - 3),
            2 => parts.split_at(parts.len() - 2),
            _ => return None,
        };

        let command = command_parts.join("_");
        if command.is_empty() {
            return None;
        }

        Some(Self {
            command,
            counter: fields[0].parse().ok()?,
            pid: fields[1].parse().ok()?,
            nonce: match fields.get(2) {
                Some(n) => Some(n.parse().ok()?),
                None => None,
            },
        })
    }

    /// Parse a name that belongs to `command`
    ///
    /// Unlike [`SessionName::parse`] this knows where the command ends, so a
    /// command whose name ends in digits is read correctly.
    pub fn parse_for(command: &str, dir_name: &str) -> Option<Self> {
        let rest = dir_name.strip_prefix(command)?.strip_prefix('_')?;
        let fields: Vec<&str> = rest.split('_').collect();
        if !(2..=3).contains(&fields.len()) {
            return None;
        }
        Some(Self {
            command: command.to_string(),
            counter: fields[0].parse().ok()?,
            pid: fields[1].parse().ok()?,
            nonce: match fields.get(2) {
                Some(n) => Some(n.parse().ok()?),
                None => None,
            },
        })
    }

    pub fn dir_name(&self) -> String {
        match self.nonce {
            Some(nonce) => format!("{}_{}_{}_{}", self.command, self.counter, self.pid, nonce),
            None => format!("{}_{}_{}", self.command, self.counter, self.pid),
        }
    }
}

/// A created and populated session directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    name: SessionName,
    root: PathBuf,
}

impl Session {
    pub fn name(&self) -> &SessionName {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn args_path(&self) -> PathBuf {
        self.root.join(ARGS_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn cmd_dir(&self) -> PathBuf {
        self.root.join(CMD_DIR)
    }

    pub fn payloads_dir(&self) -> PathBuf {
        self.root.join(PAYLOADS_DIR)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.root.join("metrics.json")
    }

    pub fn events_path(&self) -> PathBuf {
        self.root.join("events.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join("ldscope.log")
    }
}

/// Allocates session directories under a history root
pub struct SessionDirectory {
    history_root: PathBuf,
    test_mode: bool,
    pid: u32,
}

impl SessionDirectory {
    pub fn new(history_root: impl Into<PathBuf>, test_mode: bool) -> Self {
        Self {
            history_root: history_root.into(),
            test_mode,
            pid: std::process::id(),
        }
    }

    /// Use `pid` in session names instead of the current process id
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn history_root(&self) -> &Path {
        &self.history_root
    }

    /// Allocate and populate a session for `argv`
    pub fn create(&self, argv: &[String], now: SystemTime) -> Result<Session> {
        let command = command_basename(argv)?;
        let counter = history::next_counter(&self.history_root, &command);
        let nonce = if self.test_mode {
            Some(
                now.duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or(0),
            )
        } else {
            None
        };

        let name = SessionName {
            command,
            counter,
            pid: self.pid,
            nonce,
        };
        let root = self.history_root.join(name.dir_name());

        fs::DirBuilder::new()
            .recursive(true)
            .mode(HISTORY_DIR_MODE)
            .create(&self.history_root)
            .map_err(|e| ScopeError::session(&self.history_root, e))?;

        // Non-recursive: an existing directory with this name is an error.
        make_dir(&root)?;
        let session = Session { name, root };
        make_dir(&session.cmd_dir())?;
        make_dir(&session.payloads_dir())?;

        let args = serde_json::to_vec(argv)?;
        let args_path = session.args_path();
        fs::write(&args_path, args).map_err(|e| ScopeError::session(&args_path, e))?;

        log::info!("Created session {}", session.root.display());
        Ok(session)
    }
}

fn make_dir(path: &Path) -> Result<()> {
    fs::DirBuilder::new()
        .mode(SESSION_DIR_MODE)
        .create(path)
        .map_err(|e| ScopeError::session(path, e))
}

/// Final path segment of `argv[0]`
fn command_basename(argv: &[String]) -> Result<String> {
    let first = argv
        .first()
        .ok_or_else(|| ScopeError::Config("Empty command provided".to_string()))?;
    Path::new(first)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ScopeError::Config(format!("Cannot derive a command name from {:?}", first)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_session_layout() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("history");
        let sessions = SessionDirectory::new(&history, true).with_pid(4242);

        let session = sessions.create(&argv(&["/bin/foo"]), UNIX_EPOCH).unwrap();

        assert_eq!(session.root(), history.join("foo_1_4242_0"));
        assert!(session.cmd_dir().is_dir());
        assert!(session.payloads_dir().is_dir());
        assert_eq!(fs::read_dir(session.cmd_dir()).unwrap().count(), 0);
        assert_eq!(fs::read_dir(session.payloads_dir()).unwrap().count(), 0);
        assert_eq!(
            fs::read_to_string(session.args_path()).unwrap(),
            r#"["/bin/foo"]"#
        );
    }

    #[test]
    fn test_session_dir_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let session = SessionDirectory::new(dir.path(), false)
            .create(&argv(&["ls"]), SystemTime::now())
            .unwrap();
        for path in [session.root().to_path_buf(), session.cmd_dir(), session.payloads_dir()] {
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o700, 0o700, "{}", path.display());
        }
    }

    #[test]
    fn test_args_manifest_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionDirectory::new(dir.path(), false)
            .create(&argv(&["/bin/echo", "true"]), SystemTime::now())
            .unwrap();
        assert_eq!(
            fs::read(session.args_path()).unwrap(),
            br#"["/bin/echo","true"]"#
        );
    }

    #[test]
    fn test_no_nonce_outside_test_mode() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionDirectory::new(dir.path(), false)
            .with_pid(7)
            .create(&argv(&["/usr/bin/env"]), SystemTime::now())
            .unwrap();
        assert_eq!(session.name().dir_name(), "env_1_7");
        assert_eq!(session.name().nonce, None);
    }

    #[test]
    fn test_counters_strictly_increase() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionDirectory::new(dir.path(), false);

        let mut names = HashSet::new();
        let mut last = 0;
        for _ in 0..5 {
            let session = sessions.create(&argv(&["/bin/true"]), SystemTime::now()).unwrap();
            assert!(session.name().counter > last);
            last = session.name().counter;
            assert!(names.insert(session.name().dir_name()));
        }
        assert_eq!(last, 5);
    }

    #[test]
    fn test_counters_are_per_command() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionDirectory::new(dir.path(), false);
        sessions.create(&argv(&["/bin/ls"]), SystemTime::now()).unwrap();
        sessions.create(&argv(&["/bin/ls"]), SystemTime::now()).unwrap();
        let other = sessions.create(&argv(&["/bin/cat"]), SystemTime::now()).unwrap();
        assert_eq!(other.name().counter, 1);
    }

    #[test]
    fn test_empty_argv_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = SessionDirectory::new(dir.path(), false)
            .create(&[], SystemTime::now())
            .unwrap_err();
        assert!(matches!(err, ScopeError::Config(_)));
    }

    #[test]
    fn test_history_root_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("history");
        fs::write(&blocker, b"").unwrap();

        let err = SessionDirectory::new(&blocker, true)
            .create(&argv(&["foo"]), UNIX_EPOCH)
            .unwrap_err();
        assert!(matches!(err, ScopeError::Session { .. }));
    }

    #[test]
    fn test_existing_session_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionDirectory::new(dir.path(), true).with_pid(1);
        // A stray file with the exact name the next session would take.
        fs::write(dir.path().join("foo_1_1_0"), b"").unwrap();
        let err = sessions.create(&argv(&["foo"]), UNIX_EPOCH).unwrap_err();
        assert!(matches!(err, ScopeError::Session { .. }));
    }

    #[test]
    fn test_parse_names() {
        let name = SessionName::parse("echo_3_1234").unwrap();
        assert_eq!(name.command, "echo");
        assert_eq!((name.counter, name.pid, name.nonce), (3, 1234, None));

        let name = SessionName::parse("my_tool_2_99_0").unwrap();
        assert_eq!(name.command, "my_tool");
        assert_eq!(name.nonce, Some(0));
        assert_eq!(name.dir_name(), "my_tool_2_99_0");

        assert_eq!(SessionName::parse("echo"), None);
        assert_eq!(SessionName::parse("echo_x_1"), None);
        assert_eq!(SessionName::parse("1_2"), None);
    }

    #[test]
    fn test_parse_for_known_command() {
        let name = SessionName::parse_for("python3", "python3_4_10_55").unwrap();
        assert_eq!((name.counter, name.pid, name.nonce), (4, 10, Some(55)));

        assert_eq!(SessionName::parse_for("my", "my_tool_1_2"), None);
        assert_eq!(SessionName::parse_for("foo", "foobar_1_2"), None);
        assert_eq!(SessionName::parse_for("foo", "foo_1_2_3_4"), None);
    }
}
