//! Lifecycle of the asynchronous logging backbone
//!
//! ```text
//! producers --(QueueLayer)--> bounded queue --> listener thread --> sinks
//! ```
//!
//! [`LogBackbone::install`] creates the queue and the context-enriching layer
//! and makes them the default dispatcher of the calling thread. Sinks are
//! attached later by [`LogBackbone::start_listener`]; anything logged in the
//! meantime waits in the queue.

use crate::{
    config::LoggingConfig,
    error::LoggingError,
    layer::QueueLayer,
    panic::{
        PanicHookGuard,
        install_panic_hook,
    },
    queue::{
        Message,
        RecordQueue,
    },
    sink::{
        ConsoleSink,
        FileSink,
        LogSink,
    },
};
use std::{
    fs,
    path::Path,
    sync::{
        Arc,
        mpsc::{
            Receiver,
            TryRecvError,
        },
    },
    thread::{
        self,
        JoinHandle,
    },
};
use tracing::{
    Dispatch,
    dispatcher::{
        self,
        DefaultGuard,
    },
};
use tracing_subscriber::{
    Registry,
    layer::SubscriberExt,
};

/// Counters reported by the listener when it stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStats {
    /// Records handed to the sinks
    pub delivered: u64,
    /// Records that arrived after the stop sentinel
    pub discarded: u64,
    /// Failed sink writes and flushes
    pub write_errors: u64,
}

/// Summary returned by the first call to [`LogBackbone::shutdown`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub listener: ListenerStats,
    /// Records dropped by producers under backpressure or after shutdown
    pub dropped: u64,
}

/// Owner of the queue, its listener thread and the installed dispatcher.
///
/// The dispatcher is installed as the default of the thread calling
/// [`install`](Self::install) only; other threads join in through a captured
/// [`LogContext`](crate::LogContext). Dropping the backbone shuts it down.
pub struct LogBackbone {
    queue: Arc<RecordQueue>,
    receiver: Option<Receiver<Message>>,
    listener: Option<JoinHandle<ListenerStats>>,
    dispatch: Dispatch,
    guard: Option<DefaultGuard>,
    panic_hook: Option<PanicHookGuard>,
    report: Option<ShutdownReport>,
}

impl LogBackbone {
    /// Install the queue and context enrichment without any sink.
    pub fn install(config: &LoggingConfig) -> Self {
        let (queue, receiver) = RecordQueue::bounded(
            config.queue.capacity,
            config.queue.enqueue_timeout(),
        );
        let layer = QueueLayer::new(Arc::clone(&queue), config.level.into());
        let dispatch = Dispatch::new(Registry::default().with(layer));
        let guard = dispatcher::set_default(&dispatch);
        let panic_hook = install_panic_hook(config.panic.clone());
        Self {
            queue,
            receiver: Some(receiver),
            listener: None,
            dispatch,
            guard: Some(guard),
            panic_hook,
            report: None,
        }
    }

    /// Install the backbone and attach the console and file sinks.
    ///
    /// An existing file at `log_file` is removed first.
    pub fn init(
        config: &LoggingConfig,
        log_file: &Path,
    ) -> Result<Self, LoggingError> {
        let mut backbone = Self::install(config);
        if log_file.exists() {
            tracing::warn!(
                "Removing existing log file {}",
                log_file.display()
            );
            if let Err(err) = fs::remove_file(log_file) {
                tracing::error!(
                    "Failed to remove existing log file {}: {}",
                    log_file.display(),
                    err
                );
            }
        }
        let mut sinks: Vec<Box<dyn LogSink>> = Vec::new();
        if config.log_to_console {
            sinks.push(Box::new(ConsoleSink::stderr(
                config.console_level.into(),
                config.enable_ansi,
                config.show_elapsed,
            )));
        }
        sinks.push(Box::new(FileSink::create(
            log_file,
            config.file_level.into(),
            config.file_format,
        )?));
        backbone.start_listener(sinks)?;
        Ok(backbone)
    }

    /// Spawn the single consumer delivering queued records to `sinks`.
    pub fn start_listener(
        &mut self,
        sinks: Vec<Box<dyn LogSink>>,
    ) -> Result<(), LoggingError> {
        if self.report.is_some() {
            return Err(LoggingError::ShutDown);
        }
        let receiver = self
            .receiver
            .take()
            .ok_or(LoggingError::ListenerStarted)?;
        let handle = thread::Builder::new()
            .name("log-listener".into())
            .spawn(move || run_listener(receiver, sinks))?;
        self.listener = Some(handle);
        Ok(())
    }

    /// Dispatcher feeding the queue, for use on other threads
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Records dropped so far
    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    pub fn is_shut_down(&self) -> bool {
        self.report.is_some()
    }

    /// Drain the queue into the sinks, stop the listener and restore the
    /// previously active dispatcher and panic hook.
    ///
    /// Later calls return the report of the first one.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if let Some(report) = self.report {
            return report;
        }
        let mut listener = ListenerStats::default();
        if let Some(handle) = self.listener.take() {
            self.queue.close();
            listener = handle.join().unwrap_or_else(|_| {
                eprintln!("log listener panicked");
                ListenerStats::default()
            });
        } else if let Some(receiver) = self.receiver.take() {
            // never started: nothing will consume what is buffered
            listener.discarded = count_records(&receiver);
        }
        if let Some(mut hook) = self.panic_hook.take() {
            hook.restore();
        }
        self.guard.take();
        let report = ShutdownReport {
            listener,
            dropped: self.queue.dropped(),
        };
        if report.dropped > 0 || report.listener.discarded > 0 {
            eprintln!(
                "logging: {} record(s) dropped, {} discarded at shutdown",
                report.dropped, report.listener.discarded
            );
        }
        if report.listener.write_errors > 0 {
            eprintln!(
                "logging: {} sink write error(s)",
                report.listener.write_errors
            );
        }
        self.report = Some(report);
        report
    }
}

impl Drop for LogBackbone {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn count_records(receiver: &Receiver<Message>) -> u64 {
    receiver
        .try_iter()
        .filter(|m| matches!(m, Message::Record(_)))
        .count() as u64
}

fn flush_all(
    sinks: &mut [Box<dyn LogSink>],
    stats: &mut ListenerStats,
) {
    for sink in sinks.iter_mut() {
        if sink.flush().is_err() {
            stats.write_errors += 1;
        }
    }
}

fn run_listener(
    receiver: Receiver<Message>,
    mut sinks: Vec<Box<dyn LogSink>>,
) -> ListenerStats {
    let mut stats = ListenerStats::default();
    loop {
        let message = match receiver.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) => {
                // idle: make what we have visible before blocking
                flush_all(&mut sinks, &mut stats);
                match receiver.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                }
            },
            Err(TryRecvError::Disconnected) => break,
        };
        match message {
            Message::Record(record) => {
                stats.delivered += 1;
                for sink in sinks.iter_mut().filter(|s| s.accepts(&record)) {
                    if sink.write(&record).is_err() {
                        stats.write_errors += 1;
                    }
                }
            },
            Message::Shutdown => break,
        }
    }
    flush_all(&mut sinks, &mut stats);
    stats.discarded = count_records(&receiver);
    stats
}
