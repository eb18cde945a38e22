//! Capturing records in tests

use crate::{
    backbone::LogBackbone,
    config::{
        LevelName,
        LoggingConfig,
    },
    record::LogRecord,
    sink::{
        MemorySink,
        RecordBuffer,
    },
};
use tracing::Level;

/// Installs a backbone on the current thread that keeps every record in memory.
///
/// ```ignore
/// let capture = LogCapture::start();
/// tracing::info!("hello");
/// let records = capture.finish();
/// assert_eq!(records[0].message, "hello");
/// ```
pub struct LogCapture {
    backbone: LogBackbone,
    buffer: RecordBuffer,
}

impl LogCapture {
    pub fn start() -> Self {
        let config = LoggingConfig::default()
            .with_level(LevelName::Trace)
            .console(false)
            .panic_hook(false);
        let mut backbone = LogBackbone::install(&config);
        let sink = MemorySink::new(Level::TRACE);
        let buffer = sink.buffer();
        // a fresh backbone always accepts its first listener
        let _ = backbone.start_listener(vec![Box::new(sink)]);
        Self { backbone, buffer }
    }

    /// Shut the backbone down and return everything it delivered, in order.
    pub fn finish(mut self) -> Vec<LogRecord> {
        self.backbone.shutdown();
        self.buffer
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

/// Messages of the records attributed to `test_id`
pub fn messages_for<'a>(
    records: &'a [LogRecord],
    test_id: &str,
) -> Vec<&'a str> {
    records
        .iter()
        .filter(|r| r.test_id.as_deref() == Some(test_id))
        .map(|r| r.message.as_str())
        .collect()
}
