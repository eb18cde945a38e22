use super::ReportGenerator;
use crate::{
    error::ReportError,
    status::RunResults,
};
use std::path::{
    Path,
    PathBuf,
};

const TEXT_RED: &str = "\x1b[91m";
const TEXT_GREEN: &str = "\x1b[92m";
const TEXT_RESET: &str = "\x1b[0m";
const SEPARATOR_LEN: usize = 50;

/// Colour-coded table of test id, status code and reason, written to the log.
#[derive(Debug, Clone)]
pub struct ShortReport {
    log_file: PathBuf,
}

impl ShortReport {
    pub fn new(log_file: &Path) -> Self {
        Self {
            log_file: log_file.to_path_buf(),
        }
    }
}

fn row(
    name: &str,
    code: &str,
    reason: &str,
) -> String {
    format!("{:<30}: {:<15} {}", name, code, reason)
}

impl ReportGenerator for ShortReport {
    fn generate(
        &self,
        results: &RunResults,
    ) -> Result<(), ReportError> {
        let separator = "=".repeat(SEPARATOR_LEN);
        tracing::info!("{}", separator);
        tracing::info!(
            "Short summary: (Fail will be colored as red, passed will be colored as green.)"
        );
        tracing::info!("{}", separator);
        tracing::info!("{}", row("Test name", "Error code", "Reason"));
        for (test_id, result) in results {
            let color = if result.is_success() {
                TEXT_GREEN
            } else {
                TEXT_RED
            };
            let line = row(test_id, result.status.code(), &result.reason);
            tracing::info!("{}{}{}", color, line, TEXT_RESET);
        }
        tracing::info!("{}", separator);
        tracing::info!(
            "Please check <{}> for the detailed message.",
            self.log_file.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{
        CaseResult,
        Status,
        StepFailure,
    };
    use regtest_trace::testing::LogCapture;

    #[test]
    fn failures_are_red_and_successes_green() {
        let mut results = RunResults::new();
        results.insert("Hydro/sod".into(), CaseResult::success(Default::default()));
        results.insert(
            "Hydro/blast".into(),
            CaseResult::failed(
                StepFailure::new(Status::CompileErr, "Compiling error."),
                Default::default(),
            ),
        );

        let capture = LogCapture::start();
        ShortReport::new(Path::new("test.log")).generate(&results).unwrap();
        let records = capture.finish();

        let line = |id: &str| {
            records
                .iter()
                .find(|r| r.message.contains(id))
                .map(|r| r.message.clone())
                .unwrap()
        };
        assert!(line("Hydro/sod").starts_with(TEXT_GREEN));
        let failed = line("Hydro/blast");
        assert!(failed.starts_with(TEXT_RED));
        assert!(failed.contains("COMPILE_ERR"));
        assert!(failed.contains("Compiling error."));
        assert!(failed.ends_with(TEXT_RESET));
    }
}
