//! Destinations fed by the listener thread

use crate::{
    config::FileFormat,
    error::LoggingError,
    record::LogRecord,
    timer::CompactTimer,
};
use std::{
    fs::{
        self,
        File,
    },
    io::{
        self,
        BufWriter,
        Write,
    },
    path::Path,
    sync::{
        Arc,
        Mutex,
    },
};
use tracing::Level;

/// A destination for log records.
///
/// Sinks are owned and driven by the single listener thread, so they see
/// records in enqueue order and need no locking of their own.
pub trait LogSink: Send {
    /// Least severe level this sink writes
    fn level(&self) -> Level;

    fn write(
        &mut self,
        record: &LogRecord,
    ) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    fn accepts(
        &self,
        record: &LogRecord,
    ) -> bool {
        record.level <= self.level()
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

/// Human-oriented sink: `elapsed : LEVEL target : message`
pub struct ConsoleSink {
    level: Level,
    ansi: bool,
    timer: Option<CompactTimer>,
    out: Box<dyn Write + Send>,
}

impl ConsoleSink {
    pub fn stderr(
        level: Level,
        ansi: bool,
        show_elapsed: bool,
    ) -> Self {
        Self::with_writer(level, ansi, show_elapsed, Box::new(io::stderr()))
    }

    pub fn with_writer(
        level: Level,
        ansi: bool,
        show_elapsed: bool,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            level,
            ansi,
            timer: show_elapsed.then(CompactTimer::new),
            out,
        }
    }

    fn format_line(
        &self,
        record: &LogRecord,
    ) -> String {
        let mut line = String::new();
        if let Some(timer) = &self.timer {
            line.push_str(&timer.elapsed());
            line.push_str(" : ");
        }
        let level = format!("{:<8}", record.level.as_str());
        if self.ansi {
            line.push_str(level_color(record.level));
            line.push_str(&level);
            line.push_str("\x1b[0m");
        } else {
            line.push_str(&level);
        }
        line.push_str(&format!(
            " {:<20} : {}",
            record.target,
            record.body()
        ));
        line
    }
}

impl LogSink for ConsoleSink {
    fn level(&self) -> Level {
        self.level
    }

    fn write(
        &mut self,
        record: &LogRecord,
    ) -> io::Result<()> {
        let line = self.format_line(record);
        writeln!(self.out, "{}", line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Persistent sink, either compact text with context or JSON lines
pub struct FileSink {
    level: Level,
    format: FileFormat,
    out: BufWriter<File>,
}

impl FileSink {
    /// Create (truncate) the log file, creating parent directories as needed.
    pub fn create(
        path: &Path,
        level: Level,
        format: FileFormat,
    ) -> Result<Self, LoggingError> {
        let open = || -> io::Result<File> {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            File::create(path)
        };
        let file = open().map_err(|source| LoggingError::OpenSink {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            level,
            format,
            out: BufWriter::new(file),
        })
    }
}

/// `LEVEL    target               [test_id|phase] message`
pub fn format_text_line(record: &LogRecord) -> String {
    format!(
        "{:<8} {:<20} [{}|{}] {}",
        record.level.as_str(),
        record.target,
        record.test_id_or_placeholder(),
        record.phase_or_placeholder(),
        record.body()
    )
}

impl LogSink for FileSink {
    fn level(&self) -> Level {
        self.level
    }

    fn write(
        &mut self,
        record: &LogRecord,
    ) -> io::Result<()> {
        match self.format {
            FileFormat::Text => {
                writeln!(self.out, "{}", format_text_line(record))
            },
            FileFormat::Json => {
                serde_json::to_writer(&mut self.out, record)?;
                self.out.write_all(b"\n")
            },
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Shared buffer filled by a [`MemorySink`]
pub type RecordBuffer = Arc<Mutex<Vec<LogRecord>>>;

/// Keeps records in memory, mostly for assertions in tests
pub struct MemorySink {
    level: Level,
    records: RecordBuffer,
}

impl MemorySink {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            records: RecordBuffer::default(),
        }
    }

    pub fn buffer(&self) -> RecordBuffer {
        Arc::clone(&self.records)
    }
}

impl LogSink for MemorySink {
    fn level(&self) -> Level {
        self.level
    }

    fn write(
        &mut self,
        record: &LogRecord,
    ) -> io::Result<()> {
        self.records
            .lock()
            .map_err(|_| io::Error::other("record buffer poisoned"))?
            .push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
