//! Configuration for the logging backbone

mod builder;
mod loader;
mod types;

pub use types::{
    FileFormat,
    LevelName,
    LoggingConfig,
    PanicConfig,
    QueueConfig,
};
