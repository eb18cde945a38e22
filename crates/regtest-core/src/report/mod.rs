//! Summaries of a finished run

mod short;
mod timing;

pub use short::ShortReport;
pub use timing::TimingReport;

use crate::{
    error::ReportError,
    runtime::RuntimeVariables,
    status::RunResults,
};

pub trait ReportGenerator {
    fn generate(
        &self,
        results: &RunResults,
    ) -> Result<(), ReportError>;
}

/// Generator registered under `name`.
///
/// `WSXCYC` is accepted as an alias of `SHORT`.
pub fn report_generator(
    name: &str,
    rtvars: &RuntimeVariables,
) -> Result<Box<dyn ReportGenerator>, ReportError> {
    match name {
        "SHORT" | "WSXCYC" => Ok(Box::new(ShortReport::new(rtvars.output()))),
        "TIMING" => Ok(Box::new(TimingReport::new(rtvars.timing_report_path()))),
        other => Err(ReportError::Unknown(other.to_string())),
    }
}

/// Run every report in `names`; a failing report does not stop the others.
///
/// Returns the number of reports that failed.
pub fn generate_reports(
    names: &[String],
    rtvars: &RuntimeVariables,
    results: &RunResults,
) -> usize {
    if names.is_empty() {
        tracing::warn!("No report generators requested");
        return 0;
    }
    let mut failed = 0;
    for name in names {
        tracing::info!("Generating summary using: {}", name);
        let outcome =
            report_generator(name, rtvars).and_then(|generator| generator.generate(results));
        if let Err(err) = outcome {
            tracing::error!("Error while generating summary with '{}': {}", name, err);
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        runtime::RuntimeSettings,
        status::CaseResult,
    };
    use pretty_assertions::assert_eq;
    use regtest_trace::testing::LogCapture;

    #[test]
    fn unknown_reports_do_not_stop_the_others() {
        let root = tempfile::tempdir().unwrap();
        let rtvars = RuntimeVariables::new(RuntimeSettings {
            root: root.path().to_path_buf(),
            output: root.path().join("run.log").display().to_string(),
            ..Default::default()
        })
        .unwrap();
        let mut results = RunResults::new();
        results.insert("Hydro/sod".into(), CaseResult::success(Default::default()));

        let capture = LogCapture::start();
        let failed = generate_reports(
            &["NOPE".into(), "TIMING".into(), "SHORT".into()],
            &rtvars,
            &results,
        );
        let records = capture.finish();

        assert_eq!(failed, 1);
        assert!(root.path().join("run_timing.log").is_file());
        assert!(records.iter().any(|r| r.message.contains("Unknown report generator: NOPE")));
        assert!(records.iter().any(|r| r.message.contains("Hydro/sod")));
    }
}
