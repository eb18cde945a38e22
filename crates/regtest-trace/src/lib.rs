//! Asynchronous, context-aware logging for the regression test runner.
//!
//! Every `tracing` event is enriched on the producing thread with the
//! innermost `test_id` and `phase` of its span scope, pushed into one bounded
//! queue, and written to the configured sinks by a single listener thread.
//! See [`LogBackbone`] for the lifecycle and [`LogContext`] for carrying the
//! context into worker threads.

mod backbone;
pub mod config;
mod context;
mod error;
mod field_visitor;
mod layer;
mod panic;
mod queue;
mod record;
pub mod sink;
mod timer;

#[cfg(any(test, feature = "test-api"))]
pub mod testing;

pub use backbone::{
    ListenerStats,
    LogBackbone,
    ShutdownReport,
};
pub use config::{
    FileFormat,
    LevelName,
    LoggingConfig,
};
pub use context::{
    LogContext,
    case_span,
    phase_span,
};
pub use error::{
    ConfigError,
    LoggingError,
};
pub use layer::QueueLayer;
pub use queue::RecordQueue;
pub use record::{
    LogRecord,
    NO_CONTEXT,
};
