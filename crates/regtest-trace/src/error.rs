use std::{
    io,
    path::PathBuf,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read logging config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse logging config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to open log file {}: {source}", path.display())]
    OpenSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("the log listener has already been started")]
    ListenerStarted,
    #[error("the logging backbone has been shut down")]
    ShutDown,
}
