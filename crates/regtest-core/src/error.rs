use crate::status::{
    Status,
    StepFailure,
};
use std::{
    io,
    path::PathBuf,
    process::ExitStatus,
};
use thiserror::Error;

/// A value that has no deterministic canonical form
#[derive(Debug, Error, PartialEq)]
pub enum CanonicalError {
    #[error("cannot canonicalize non-finite float {value} at '{path}'")]
    NonFinite { path: String, value: f64 },
    #[error("mapping keys collide after stringification: '{0}'")]
    KeyCollision(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Duplicate path/name found: {0}")]
    Duplicate(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CaseError {
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Invalid priority: {0}")]
    Priority(String),
    #[error("Case {0} would run inside the compare tool directory")]
    ReservedPath(String),
}

/// Invalid runtime settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown reference location '{0}'")]
    UnknownReferenceLocation(String),
    #[error("Error level must be 0, 1 or 2, got {0}")]
    ErrorLevel(u8),
    #[error("Invalid priority: {0}")]
    Priority(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("'{command}' exited with {status}")]
    Exit { command: String, status: ExitStatus },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Failure staging or storing reference data
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The store has no reference for the case (recoverable in update mode)
    #[error("{0}")]
    Missing(String),
    /// Network, authentication or layout problem
    #[error("{message}")]
    Provider { message: String, status: Status },
}

impl ReferenceError {
    pub fn provider(
        message: impl Into<String>,
        status: Status,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            status,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            ReferenceError::Missing(_) => Status::MissingFile,
            ReferenceError::Provider { status, .. } => *status,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ReferenceError::Missing(_))
    }

    pub fn to_failure(&self) -> StepFailure {
        StepFailure::new(self.status(), self.to_string())
    }
}

/// Errors of the remote catalog client
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Unexpected catalog response: {0}")]
    Response(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unknown model {0}")]
    UnknownModel(String),
    #[error("failed to read machine config {}: {source}", path.display())]
    MachineConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Compare tool missing after build: {}", .0.display())]
    MissingBinary(PathBuf),
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unknown report generator: {0}")]
    Unknown(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// An error outside the handled pipeline phases; aborts the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("{0}")]
    Unexpected(String),
}

/// Outcome of a pipeline phase that did not succeed
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Handled failure, materialized as the case result
    #[error("{0}")]
    Failed(StepFailure),
    /// Unexpected error, propagated out of the run loop
    #[error(transparent)]
    Fatal(#[from] RunError),
}

impl From<StepFailure> for PhaseError {
    fn from(failure: StepFailure) -> Self {
        PhaseError::Failed(failure)
    }
}

impl PhaseError {
    pub fn failed(
        status: Status,
        reason: impl Into<String>,
    ) -> Self {
        PhaseError::Failed(StepFailure::new(status, reason))
    }
}
