//! Configuration types for the logging backbone

use serde::{
    Deserialize,
    Serialize,
};
use std::{
    str::FromStr,
    time::Duration,
};
use tracing::{
    Level,
    level_filters::LevelFilter,
};

fn default_true() -> bool {
    true
}

fn default_capacity() -> usize {
    10_000
}

fn default_enqueue_timeout_ms() -> u64 {
    1_000
}

/// Level names as written in config files and environment variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelName {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LevelName> for Level {
    fn from(name: LevelName) -> Self {
        match name {
            LevelName::Trace => Level::TRACE,
            LevelName::Debug => Level::DEBUG,
            LevelName::Info => Level::INFO,
            LevelName::Warn => Level::WARN,
            LevelName::Error => Level::ERROR,
        }
    }
}

impl From<LevelName> for LevelFilter {
    fn from(name: LevelName) -> Self {
        LevelFilter::from_level(name.into())
    }
}

impl FromStr for LevelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Encoding used by the file sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// `LEVEL target [test_id|phase] message`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown file format '{}'", other)),
        }
    }
}

/// Sizing and backpressure of the record queue
///
/// A producer facing a full queue retries until `enqueue_timeout_ms` has
/// elapsed and then drops its record. Dropped records are counted and
/// reported when the backbone shuts down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_enqueue_timeout_ms")]
    pub enqueue_timeout_ms: u64,
}

impl QueueConfig {
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout_ms(),
        }
    }
}

/// Configuration for panic message logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PanicConfig {
    /// Install the logging panic hook at all
    #[serde(default = "default_true")]
    pub install: bool,
    /// Include the panic payload and location in the record
    #[serde(default = "default_true")]
    pub show_message: bool,
    /// Call the previously installed hook (which prints to stderr)
    #[serde(default = "default_true")]
    pub show_default_hook: bool,
}

impl Default for PanicConfig {
    fn default() -> Self {
        Self {
            install: true,
            show_message: true,
            show_default_hook: true,
        }
    }
}

fn default_level() -> LevelName {
    LevelName::Debug
}

/// Configuration of the logging backbone and its sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Most verbose level admitted into the queue
    #[serde(default = "default_level")]
    pub level: LevelName,
    /// Minimum level written to the console
    #[serde(default = "default_level")]
    pub console_level: LevelName,
    /// Minimum level written to the log file
    #[serde(default = "default_level")]
    pub file_level: LevelName,
    #[serde(default)]
    pub file_format: FileFormat,
    /// Write records to stderr as well as the log file
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    /// Colour the level column on the console
    #[serde(default = "default_true")]
    pub enable_ansi: bool,
    /// Prefix console lines with the time elapsed since installation
    #[serde(default = "default_true")]
    pub show_elapsed: bool,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub panic: PanicConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_level: default_level(),
            file_level: default_level(),
            file_format: FileFormat::default(),
            log_to_console: true,
            enable_ansi: true,
            show_elapsed: true,
            queue: QueueConfig::default(),
            panic: PanicConfig::default(),
        }
    }
}
