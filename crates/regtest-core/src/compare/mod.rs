//! Validation of produced artifacts against reference data

mod hdf5;
mod note;
mod text;

pub use hdf5::{
    COMPARE_LOG,
    COMPARE_REPORT,
    KeyInfo,
    compare_hdf5,
    report_has_mismatch,
};
pub use note::{
    NoteDiff,
    NoteParameters,
    compare_note,
    diff_notes,
    parse_note,
    read_note,
};
pub use text::{
    NumericTable,
    TableError,
    compare_text,
};

use crate::{
    build_cache::CompareToolCache,
    case::{
        FileType,
        TestCase,
    },
    error::BuildError,
    process::ProcessCommand,
    reference::ReferenceProvider,
    runtime::RuntimeVariables,
    status::{
        Status,
        StepFailure,
        Timing,
    },
    timing::time_step,
};
use std::path::{
    Path,
    PathBuf,
};

pub const STEP_FETCH: &str = "compare_fetch_references";
pub const STEP_BUILD_TOOL: &str = "compare_build_compare_tool";
pub const STEP_RUN: &str = "compare_run_comparisons";
pub const STEP_PUSH: &str = "compare_push_references";

const FAILED_COMPARISON: &str = "Fail data comparison.";

/// Stages references, compares every declared artifact and, in update
/// mode, stores the run's artifacts as the new references.
pub struct Comparator {
    provider: ReferenceProvider,
    tools: CompareToolCache,
    error_level: u8,
    update_ref: bool,
}

impl Comparator {
    pub fn new(
        provider: ReferenceProvider,
        tools: CompareToolCache,
        error_level: u8,
        update_ref: bool,
    ) -> Self {
        Self {
            provider,
            tools,
            error_level,
            update_ref,
        }
    }

    pub fn from_runtime(
        rtvars: &RuntimeVariables,
        provider: ReferenceProvider,
    ) -> Self {
        Self::new(
            provider,
            CompareToolCache::new(rtvars),
            rtvars.error_level(),
            rtvars.update_ref(),
        )
    }

    pub fn provider(&self) -> &ReferenceProvider {
        &self.provider
    }

    /// Compare the artifacts of `case` in `run_dir`, adding the time of
    /// every step to `timing`.
    pub fn compare(
        &mut self,
        case: &TestCase,
        run_dir: &Path,
        timing: &mut Timing,
    ) -> Result<(), StepFailure> {
        let fetched = time_step(STEP_FETCH, timing, || self.provider.fetch(case));
        let ref_dir = match fetched {
            Ok(dir) => Some(dir),
            Err(err) if err.is_missing() && self.update_ref => {
                tracing::info!(
                    "No reference found for {}. Will create new reference.",
                    case.test_id()
                );
                None
            },
            Err(err) => {
                tracing::error!("{}", err);
                return Err(err.to_failure());
            },
        };

        let tool = time_step(STEP_BUILD_TOOL, timing, || {
            (ref_dir.is_some() && case.has_references_of(FileType::Hdf5))
                .then(|| self.tools.get_tool(case.options()))
        });
        if let Some(Err(err)) = &tool {
            tracing::warn!("Compare tool unavailable: {}", err);
        }

        let compared = time_step(STEP_RUN, timing, || match &ref_dir {
            Some(dir) => self.run_comparisons(case, run_dir, dir, tool.as_ref()),
            None => {
                tracing::info!(
                    "Skipping comparison for {} (no reference, update mode)",
                    case.test_id()
                );
                Ok(())
            },
        });
        if let Err(failure) = compared {
            if !self.update_ref {
                return Err(failure);
            }
            tracing::warn!(
                "Comparison failed in update mode ({}); the reference will be replaced",
                failure.reason
            );
        }

        if self.update_ref {
            time_step(STEP_PUSH, timing, || self.provider.push(case, run_dir)).map_err(|err| {
                tracing::error!("Failed to push reference: {}", err);
                StepFailure::new(Status::Upload, format!("Reference update failed: {}", err))
            })?;
            tracing::info!("Reference updated for {}", case.test_id());
        }
        Ok(())
    }

    fn tolerance(
        &self,
        case: &TestCase,
    ) -> Result<f64, StepFailure> {
        case.tolerance(self.error_level).ok_or_else(|| {
            StepFailure::new(
                Status::Fail,
                format!("No tolerance level{} for {}", self.error_level, case.test_id()),
            )
        })
    }

    fn run_comparisons(
        &self,
        case: &TestCase,
        run_dir: &Path,
        ref_dir: &Path,
        tool: Option<&Result<PathBuf, BuildError>>,
    ) -> Result<(), StepFailure> {
        for reference in case.references() {
            let name = reference.file_name();
            let result = run_dir.join(name);
            let expect = ref_dir.join(name);
            let agreed = match reference.file_type {
                FileType::Text => compare_text(&result, &expect, self.tolerance(case)?),
                FileType::Hdf5 => {
                    let tolerance = self.tolerance(case)?;
                    match tool {
                        Some(Ok(tool)) => compare_hdf5(tool, &result, &expect, tolerance),
                        Some(Err(err)) => {
                            return Err(StepFailure::new(
                                Status::Comparison,
                                format!("Error while compiling the compare tool: {}", err),
                            ));
                        },
                        None => {
                            return Err(StepFailure::new(
                                Status::Comparison,
                                "Compare tool unavailable",
                            ));
                        },
                    }
                },
                FileType::Note => {
                    compare_note(&result, &expect);
                    true
                },
            };
            if !agreed {
                return Err(StepFailure::new(Status::Comparison, FAILED_COMPARISON));
            }
        }
        run_user_scripts(case.user_compare_scripts(), run_dir)
    }
}

/// Run each existing user comparison script as `sh <script> <run_dir>`.
fn run_user_scripts(
    scripts: &[String],
    run_dir: &Path,
) -> Result<(), StepFailure> {
    for script in scripts {
        let path = run_dir.join(script);
        if !path.is_file() {
            continue;
        }
        tracing::info!("Executing: {}", script);
        ProcessCommand::new([
            "sh".to_string(),
            path.display().to_string(),
            run_dir.display().to_string(),
        ])
        .current_dir(run_dir)
        .run()
        .map_err(|err| {
            tracing::error!("{}", err);
            StepFailure::new(Status::External, format!("Error while executing {}", script))
        })?;
    }
    Ok(())
}
