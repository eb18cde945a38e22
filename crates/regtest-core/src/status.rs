//! Outcome taxonomy of a case

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Status of a case, reported by its stable upper-case code name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Fail,
    MissingFile,
    /// The simulation or the compare tool did not build
    CompileErr,
    /// Generating the build configuration failed
    EditingFail,
    /// A user script exited with an error
    External,
    SimulationFail,
    Download,
    Upload,
    CopyFiles,
    /// An input file override could not be applied
    EditFile,
    Comparison,
}

impl Status {
    pub fn code(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Fail => "FAIL",
            Status::MissingFile => "MISSING_FILE",
            Status::CompileErr => "COMPILE_ERR",
            Status::EditingFail => "EDITING_FAIL",
            Status::External => "EXTERNAL",
            Status::SimulationFail => "SIMULATION_FAIL",
            Status::Download => "DOWNLOAD",
            Status::Upload => "UPLOAD",
            Status::CopyFiles => "COPY_FILES",
            Status::EditFile => "EDIT_FILE",
            Status::Comparison => "COMPARISON",
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A handled failure: the status and the short reason shown in summaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub status: Status,
    pub reason: String,
}

impl StepFailure {
    pub fn new(
        status: Status,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.reason)
    }
}

/// Seconds spent per step, in execution order
pub type Timing = IndexMap<String, f64>;

/// Final outcome of one case, produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub status: Status,
    pub reason: String,
    pub timing: Timing,
}

impl CaseResult {
    pub fn success(timing: Timing) -> Self {
        Self {
            status: Status::Success,
            reason: String::new(),
            timing,
        }
    }

    pub fn failed(
        failure: StepFailure,
        timing: Timing,
    ) -> Self {
        Self {
            status: failure.status,
            reason: failure.reason,
            timing,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Results of a run keyed by `test_id`, in execution order
pub type RunResults = IndexMap<String, CaseResult>;
