//! Configuration file loading and environment variable parsing

use super::types::LoggingConfig;
use crate::error::ConfigError;
use std::{
    env,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|v| {
        v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
    })
}

impl LoggingConfig {
    /// Load configuration from a TOML file
    ///
    /// Top-level keys must appear before any `[section]` header:
    /// ```toml
    /// level = "debug"
    /// console_level = "info"
    /// file_level = "debug"
    /// file_format = "json"
    /// log_to_console = true
    ///
    /// [queue]
    /// capacity = 10000
    /// enqueue_timeout_ms = 1000
    ///
    /// [panic]
    /// install = true
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load from a config file, falling back to environment variables, then defaults
    ///
    /// Searches for config files in this order:
    /// 1. Path specified in the `REGTEST_LOG_CONFIG` environment variable
    /// 2. `./config/logging.toml`
    /// 3. `./logging.toml`
    /// 4. `~/.config/regtest/logging.toml`
    ///
    /// Environment overrides are applied on top of whichever source was used.
    pub fn load() -> Self {
        let mut config = Self::search_file().unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    fn search_file() -> Option<Self> {
        if let Ok(config_path) = env::var("REGTEST_LOG_CONFIG") {
            match Self::from_file(&config_path) {
                Ok(config) => return Some(config),
                Err(e) => eprintln!(
                    "Warning: REGTEST_LOG_CONFIG points to invalid file: {}",
                    e
                ),
            }
        }

        let mut paths = vec![
            PathBuf::from("config").join("logging.toml"),
            PathBuf::from("logging.toml"),
        ];
        if let Some(home) =
            env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"))
        {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("regtest")
                    .join("logging.toml"),
            );
        }

        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => return Some(config),
                Err(e) => eprintln!("Warning: {}", e),
            }
        }
        None
    }

    /// Parse from environment variables on top of the defaults
    ///
    /// - `REGTEST_LOG_LEVEL`, `REGTEST_LOG_CONSOLE_LEVEL`, `REGTEST_LOG_FILE_LEVEL`
    /// - `REGTEST_LOG_FILE_FORMAT` (`text` | `json`)
    /// - `REGTEST_LOG_CONSOLE`, `REGTEST_LOG_ANSI` (`1`/`true`/`yes`)
    /// - `REGTEST_LOG_QUEUE_CAPACITY`, `REGTEST_LOG_ENQUEUE_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Some(level) = env::var("REGTEST_LOG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.level = level;
            self.console_level = level;
            self.file_level = level;
        }
        if let Some(level) = env::var("REGTEST_LOG_CONSOLE_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.console_level = level;
        }
        if let Some(level) = env::var("REGTEST_LOG_FILE_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.file_level = level;
        }
        if let Some(format) = env::var("REGTEST_LOG_FILE_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.file_format = format;
        }
        if let Some(enabled) = env_flag("REGTEST_LOG_CONSOLE") {
            self.log_to_console = enabled;
        }
        if let Some(enabled) = env_flag("REGTEST_LOG_ANSI") {
            self.enable_ansi = enabled;
        }
        if let Some(capacity) = env::var("REGTEST_LOG_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.queue.capacity = capacity;
        }
        if let Some(timeout) = env::var("REGTEST_LOG_ENQUEUE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.queue.enqueue_timeout_ms = timeout;
        }
    }
}
