/// Environment hygiene for launched commands
///
/// Launches never touch the process environment. They work on an explicit
/// `Environment` value captured once at the CLI boundary, filter out every
/// reserved `SCOPE*` variable for managed launches, and append the pointers
/// the loader needs.

use crate::config::types::{Result, ScopeError, RESERVED_ENV_PREFIX};
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

/// Ordered list of environment entries
///
/// Entries are kept as OS strings so values that are not valid UTF-8 pass
/// through untouched. Order and duplicates are preserved. Which of several
/// entries for one key a child sees depends on how it reads its environment
/// (`getenv` takes the first), so overrides go through [`Environment::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(OsString, OsString)>,
}

impl Environment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Build an environment from key/value pairs, keeping their order
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of the last entry named `key`
    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Value of `key` when it is set to a non-empty UTF-8 string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OsStr::to_str).filter(|v| !v.is_empty())
    }

    /// Append an entry after all existing ones
    pub fn push(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.push((key.into(), value.into()));
    }

    /// Builder form of [`Environment::push`]
    pub fn with_var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.push(key, value);
        self
    }

    /// Copy of this environment without any reserved-prefix entry
    ///
    /// The check is a literal, case-sensitive prefix test on the key, so
    /// `SCOPE_HOME` and `SCOPEFOO` are both dropped while `MY_SCOPE` stays.
    pub fn sanitized(&self) -> Self {
        let vars = self
            .vars
            .iter()
            .filter(|(k, _)| !is_reserved(k))
            .cloned()
            .collect::<Vec<_>>();

        let removed = self.vars.len() - vars.len();
        if removed > 0 {
            log::debug!("Removed {} reserved environment variable(s)", removed);
        }

        Self { vars }
    }

    /// Replace every entry for `key` with a single entry appended at the end
    pub fn set(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let key = key.into();
        self.vars.retain(|(k, _)| *k != key);
        self.vars.push((key, value.into()));
        self
    }

    /// True when any entry carries the reserved prefix
    pub fn has_reserved(&self) -> bool {
        self.vars.iter().any(|(k, _)| is_reserved(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// `KEY=VALUE` C strings for `execve`
    pub fn to_exec_env(&self) -> Result<Vec<CString>> {
        self.vars
            .iter()
            .map(|(k, v)| {
                let mut entry = Vec::with_capacity(k.len() + v.len() + 1);
                entry.extend_from_slice(k.as_bytes());
                entry.push(b'=');
                entry.extend_from_slice(v.as_bytes());
                CString::new(entry).map_err(|_| {
                    ScopeError::Config(format!(
                        "environment entry {} contains a NUL byte",
                        k.to_string_lossy()
                    ))
                })
            })
            .collect()
    }
}

fn is_reserved(key: &OsStr) -> bool {
    key.as_bytes().starts_with(RESERVED_ENV_PREFIX.as_bytes())
}
