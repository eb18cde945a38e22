//! Sequential execution of every selected case

use crate::{
    case::TestCase,
    error::RunError,
    pipeline::{
        CaseStages,
        run_case,
    },
    status::RunResults,
};
use regtest_trace::case_span;
use std::{
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
};

/// Run every case in order, each in a fresh `<run_root>/<test_id>`.
///
/// A handled failure only ends its own case. An unexpected error is logged
/// and aborts the remaining cases.
pub fn run_all<S: CaseStages + ?Sized>(
    stages: &mut S,
    cases: &[TestCase],
    run_root: &Path,
) -> Result<RunResults, RunError> {
    let mut results = RunResults::new();
    for case in cases {
        let span = case_span(case.test_id());
        let _case = span.enter();
        let outcome = fresh_run_dir(run_root, case)
            .map_err(RunError::from)
            .and_then(|run_dir| run_case(stages, case, &run_dir));
        match outcome {
            Ok(result) => {
                results.insert(case.test_id().to_string(), result);
            },
            Err(err) => {
                tracing::error!("Unexpected Error: {}", err);
                return Err(err);
            },
        }
    }
    Ok(results)
}

fn fresh_run_dir(
    run_root: &Path,
    case: &TestCase,
) -> io::Result<PathBuf> {
    let run_dir = run_root.join(case.test_id());
    if run_dir.is_dir() {
        fs::remove_dir_all(&run_dir)?;
        tracing::warn!("Run directory {} exists. Removed.", run_dir.display());
    }
    fs::create_dir_all(&run_dir)?;
    Ok(run_dir)
}
