/// Telemetry configuration consumed by libscope
///
/// Field order in these structs is the order of keys in the written file.
/// Do not reorder fields: libscope and stored session snapshots compare the
/// file byte for byte.
use crate::config::types::{Result, ScopeError};
use crate::session::Session;
use crate::telemetry::yaml;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Regex selecting log files by path fragment
pub const LOG_FILE_PATTERN: &str = r"[\s\/\\\.]log[s]?[\/\\\.]?";
/// Regex selecting the console streams
pub const CONSOLE_PATTERN: &str = "(stdout|stderr)";
/// Match-anything regex
pub const ANY: &str = ".*";

/// Seconds between libscope summary reports
pub const SUMMARY_PERIOD_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    Ndjson,
    Statsd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    File,
    Udp,
    Tcp,
    Unix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Buffering {
    Line,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    None,
}

/// Event source a watch rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchType {
    File,
    Console,
    Http,
    Net,
    Fs,
    Dns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tls {
    pub enable: bool,
    pub validateserver: bool,
    pub cacertpath: String,
}

impl Tls {
    pub fn disabled() -> Self {
        Self {
            enable: false,
            validateserver: false,
            cacertpath: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transport {
    #[serde(rename = "type")]
    pub kind: TransportType,
    pub path: PathBuf,
    pub buffering: Buffering,
    pub tls: Tls,
}

impl Transport {
    /// Line-buffered file transport without TLS
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: TransportType::File,
            path: path.into(),
            buffering: Buffering::Line,
            tls: Tls::disabled(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFormat {
    #[serde(rename = "type")]
    pub kind: FormatType,
    pub verbosity: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSection {
    pub enable: bool,
    pub format: MetricFormat,
    pub transport: Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFormat {
    #[serde(rename = "type")]
    pub kind: FormatType,
}

/// Selects which events of one source are captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRule {
    #[serde(rename = "type")]
    pub kind: WatchType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub value: String,
}

impl WatchRule {
    fn named(kind: WatchType, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            field: None,
            value: ANY.to_string(),
        }
    }

    fn with_field(kind: WatchType) -> Self {
        Self {
            kind,
            name: ANY.to_string(),
            field: Some(ANY.to_string()),
            value: ANY.to_string(),
        }
    }

    /// Log files, console, then http, net, fs and dns with any field
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::named(WatchType::File, LOG_FILE_PATTERN),
            Self::named(WatchType::Console, CONSOLE_PATTERN),
            Self::with_field(WatchType::Http),
            Self::with_field(WatchType::Net),
            Self::with_field(WatchType::Fs),
            Self::with_field(WatchType::Dns),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSection {
    pub enable: bool,
    pub format: EventFormat,
    pub transport: Transport,
    pub watch: Vec<WatchRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSection {
    pub level: LogLevel,
    pub transport: Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibscopeSection {
    pub configevent: bool,
    pub summaryperiod: u32,
    pub commanddir: PathBuf,
    pub log: LogSection,
}

/// The whole `scope.yml` written into a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub metric: MetricSection,
    pub event: EventSection,
    pub libscope: LibscopeSection,
}

impl ConfigDocument {
    /// Document writing all telemetry into the session directory
    pub fn for_session(session: &Session, verbosity: u8) -> Self {
        Self {
            metric: MetricSection {
                enable: true,
                format: MetricFormat {
                    kind: FormatType::Ndjson,
                    verbosity,
                },
                transport: Transport::file(session.metrics_path()),
            },
            event: EventSection {
                enable: true,
                format: EventFormat {
                    kind: FormatType::Ndjson,
                },
                transport: Transport::file(session.events_path()),
                watch: WatchRule::defaults(),
            },
            libscope: LibscopeSection {
                configevent: false,
                summaryperiod: SUMMARY_PERIOD_SECS,
                commanddir: session.cmd_dir(),
                log: LogSection {
                    level: LogLevel::Warning,
                    transport: Transport::file(session.log_path()),
                },
            },
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        self.check_paths()?;
        let value = serde_json::to_value(self)?;
        yaml::to_string(&value)
    }

    /// Serialize and write to `path`
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml).map_err(|e| ScopeError::session(path, e))?;
        log::debug!("Wrote telemetry config {}", path.display());
        Ok(())
    }

    fn check_paths(&self) -> Result<()> {
        let paths = [
            &self.metric.transport.path,
            &self.event.transport.path,
            &self.libscope.commanddir,
            &self.libscope.log.transport.path,
        ];
        match paths.iter().find(|p| !p.is_absolute()) {
            Some(relative) => Err(ScopeError::Config(format!(
                "config path {} is not absolute",
                relative.display()
            ))),
            None => Ok(()),
        }
    }
}
