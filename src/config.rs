//! Sink configuration
//!
//! A `SinkConfig` is built once (usually from `LOG_*` environment variables) and is
//! immutable for the lifetime of the sink. Core logic never reads the environment itself.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SinkError};
use crate::size::parse_size;

/// Default minimum level (INFO)
pub const DEFAULT_LEVEL: Level = Level::Info;

/// Default number of records held in memory before a flush
pub const DEFAULT_BUFFER_SIZE: usize = 10;

/// Default rotated file retention in days
pub const DEFAULT_KEEP_DAYS: u64 = 7;

/// Default size threshold for size-based rotation
pub const DEFAULT_MAX_SIZE: &str = "10M";

/// Severity of a log record, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    /// Most severe level. Emitting it flushes the sink and terminates the host.
    Fatal = 4,
}

impl Level {
    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// Map the numeric `LOG_LEVEL` value (0-4) to a level
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(Level::Debug),
            1 => Some(Level::Info),
            2 => Some(Level::Warn),
            3 => Some(Level::Error),
            4 => Some(Level::Fatal),
            _ => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Level::Fatal)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = SinkError;

    /// Accepts either the numeric form ("2") or the name ("warn", "WARNING")
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return Level::from_number(n)
                .ok_or_else(|| SinkError::Configuration(format!("log level {} out of range 0-4", n)));
        }
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "FATAL" => Ok(Level::Fatal),
            _ => Err(SinkError::Configuration(format!("unknown log level {:?}", s))),
        }
    }
}

/// When the active file gets rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationStrategy {
    None,
    Size,
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl RotationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationStrategy::None => "none",
            RotationStrategy::Size => "size",
            RotationStrategy::Hourly => "hourly",
            RotationStrategy::Daily => "daily",
            RotationStrategy::Weekly => "weekly",
            RotationStrategy::Monthly => "monthly",
        }
    }
}

impl fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RotationStrategy {
    /// Unrecognised names never rotate
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "size" => RotationStrategy::Size,
            "hourly" => RotationStrategy::Hourly,
            "daily" => RotationStrategy::Daily,
            "weekly" => RotationStrategy::Weekly,
            "monthly" => RotationStrategy::Monthly,
            _ => RotationStrategy::None,
        }
    }
}

/// Immutable configuration for one sink instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Identifying name of the script or process, shown in every record
    pub name: String,

    /// Records below this level are discarded
    pub level: Level,

    /// Active log file. None disables file output entirely.
    pub file: Option<PathBuf>,

    /// Master switch for automatic rotation
    pub rotation: bool,

    /// Rotation strategy used when `rotation` is enabled
    pub strategy: RotationStrategy,

    /// Size threshold in bytes for `RotationStrategy::Size`
    pub max_size: u64,

    /// Rotated files older than this many days are deleted (0 keeps them forever)
    pub keep_days: u64,

    /// Number of records buffered in memory before a flush
    pub buffer_size: usize,

    /// Render records as JSON instead of the human format
    pub json: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            name: "script".to_string(),
            level: DEFAULT_LEVEL,
            file: None,
            rotation: false,
            strategy: RotationStrategy::Daily,
            max_size: 10 * 1024 * 1024,
            keep_days: DEFAULT_KEEP_DAYS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            json: false,
        }
    }
}

impl SinkConfig {
    /// Create a config for `name` writing to `file`, with every other field defaulted
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file: Some(with_log_extension(file.into())),
            ..Self::default()
        }
    }

    /// Build a config from `LOG_*` variables supplied by `lookup`
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`. Empty values count as unset.
    pub fn from_env<F>(name: impl Into<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self {
            name: name.into(),
            ..Self::default()
        };

        if let Some(level) = get("LOG_LEVEL") {
            let n: u8 = level.trim().parse().map_err(|_| {
                SinkError::Configuration(format!("LOG_LEVEL must be an integer 0-4, got {:?}", level))
            })?;
            config.level = Level::from_number(n).ok_or_else(|| {
                SinkError::Configuration(format!("LOG_LEVEL {} out of range 0-4", n))
            })?;
        }

        if let Some(file) = get("LOG_FILE") {
            let expanded = shellexpand::tilde(file.trim()).into_owned();
            config.file = Some(with_log_extension(PathBuf::from(expanded)));
        }

        if let Some(rotation) = get("LOG_ROTATION") {
            config.rotation = parse_bool("LOG_ROTATION", &rotation)?;
        }

        if let Some(kind) = get("LOG_ROTATION_TYPE") {
            config.strategy = RotationStrategy::from(kind.as_str());
            if config.strategy == RotationStrategy::None && !kind.trim().eq_ignore_ascii_case("none") {
                tracing::warn!(value = %kind, "Unknown LOG_ROTATION_TYPE, rotation disabled");
            }
        }

        let max_size = get("LOG_MAX_SIZE").unwrap_or_else(|| DEFAULT_MAX_SIZE.to_string());
        config.max_size = parse_size(&max_size)
            .map_err(|e| SinkError::Configuration(format!("LOG_MAX_SIZE: {}", e)))?;

        if let Some(days) = get("LOG_KEEP_DAYS") {
            config.keep_days = days.trim().parse().map_err(|_| {
                SinkError::Configuration(format!(
                    "LOG_KEEP_DAYS must be a non-negative integer, got {:?}",
                    days
                ))
            })?;
        }

        if let Some(size) = get("LOG_BUFFER_SIZE") {
            config.buffer_size = size.trim().parse().map_err(|_| {
                SinkError::Configuration(format!(
                    "LOG_BUFFER_SIZE must be a positive integer, got {:?}",
                    size
                ))
            })?;
        }

        if let Some(json) = get("LOG_JSON") {
            config.json = parse_bool("LOG_JSON", &json)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a sink relies on
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SinkError::Configuration("name must not be empty".into()));
        }
        if self.buffer_size == 0 {
            return Err(SinkError::Configuration(
                "buffer size must be greater than zero".into(),
            ));
        }
        if self.rotation && self.strategy == RotationStrategy::Size && self.max_size == 0 {
            return Err(SinkError::Configuration(
                "max size must be greater than zero for size rotation".into(),
            ));
        }
        if let Some(file) = &self.file {
            if file.as_os_str().is_empty() || file.file_name().is_none() {
                return Err(SinkError::Configuration(format!(
                    "log file {:?} is not a file path",
                    file
                )));
            }
        }
        Ok(())
    }

    /// Check if automatic rotation can ever happen
    pub fn rotation_active(&self) -> bool {
        self.rotation && self.file.is_some() && self.strategy != RotationStrategy::None
    }
}

/// Append `.log` when the file name carries no extension
pub fn with_log_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(".log");
        PathBuf::from(name)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SinkError::Configuration(format!(
            "{} must be a boolean, got {:?}",
            key, value
        ))),
    }
}
