//! Builder methods and configuration helpers

use super::types::{
    FileFormat,
    LevelName,
    LoggingConfig,
};

impl LoggingConfig {
    /// Set the same level for the queue and both sinks
    pub fn with_level(
        mut self,
        level: LevelName,
    ) -> Self {
        self.level = level;
        self.console_level = level;
        self.file_level = level;
        self
    }

    pub fn with_console_level(
        mut self,
        level: LevelName,
    ) -> Self {
        self.console_level = level;
        self
    }

    pub fn with_file_level(
        mut self,
        level: LevelName,
    ) -> Self {
        self.file_level = level;
        self
    }

    pub fn file_format(
        mut self,
        format: FileFormat,
    ) -> Self {
        self.file_format = format;
        self
    }

    /// Enable/disable the console sink
    pub fn console(
        mut self,
        enabled: bool,
    ) -> Self {
        self.log_to_console = enabled;
        self
    }

    /// Enable/disable ANSI colors
    pub fn enable_ansi(
        mut self,
        enabled: bool,
    ) -> Self {
        self.enable_ansi = enabled;
        self
    }

    /// Bound the number of records waiting for the listener
    pub fn queue_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.queue.capacity = capacity;
        self
    }

    /// How long a producer waits on a full queue before dropping its record
    pub fn enqueue_timeout_ms(
        mut self,
        millis: u64,
    ) -> Self {
        self.queue.enqueue_timeout_ms = millis;
        self
    }

    /// Enable/disable the logging panic hook
    pub fn panic_hook(
        mut self,
        enabled: bool,
    ) -> Self {
        self.panic.install = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::default()
            .with_level(LevelName::Trace)
            .with_console_level(LevelName::Warn)
            .file_format(FileFormat::Json)
            .console(false)
            .queue_capacity(8)
            .enqueue_timeout_ms(5);

        assert_eq!(config.level, LevelName::Trace);
        assert_eq!(config.console_level, LevelName::Warn);
        assert_eq!(config.file_level, LevelName::Trace);
        assert_eq!(config.file_format, FileFormat::Json);
        assert!(!config.log_to_console);
        assert_eq!(config.queue.capacity, 8);
        assert_eq!(config.queue.enqueue_timeout(), Duration::from_millis(5));
    }

    #[test]
    fn test_level_names_parse() {
        assert_eq!("WARNING".parse::<LevelName>(), Ok(LevelName::Warn));
        assert_eq!(" debug ".parse::<LevelName>(), Ok(LevelName::Debug));
        assert!("loud".parse::<LevelName>().is_err());
    }
}
