//! Per-case pipeline
//!
//! Phases run strictly in order. The first handled failure ends the case
//! with the timing collected so far; the run directory is left as it is.

mod stages;

pub use stages::SimulationStages;

use crate::{
    case::TestCase,
    error::{
        PhaseError,
        RunError,
    },
    status::{
        CaseResult,
        Timing,
    },
    timing::time_step,
};
use regtest_trace::phase_span;
use std::{
    fmt,
    path::Path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Compile,
    Prepare,
    SetInput,
    PreScript,
    Run,
    PostScript,
    Compare,
}

impl Phase {
    /// Phases timed as a whole, in execution order
    pub const TIMED: [Phase; 6] = [
        Phase::Compile,
        Phase::Prepare,
        Phase::SetInput,
        Phase::PreScript,
        Phase::Run,
        Phase::PostScript,
    ];

    /// Log context and timing key of the phase
    pub fn name(self) -> &'static str {
        match self {
            Phase::Compile => "compile",
            Phase::Prepare => "prepare",
            Phase::SetInput => "set_input",
            Phase::PreScript => "pre_script",
            Phase::Run => "run",
            Phase::PostScript => "post_script",
            Phase::Compare => "compare",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The work behind each phase of a case
pub trait CaseStages {
    /// Execute one of the [`Phase::TIMED`] phases.
    fn execute(
        &mut self,
        phase: Phase,
        case: &TestCase,
        run_dir: &Path,
    ) -> Result<(), PhaseError>;

    /// Compare the artifacts, recording the time of each compare step.
    fn compare(
        &mut self,
        case: &TestCase,
        run_dir: &Path,
        timing: &mut Timing,
    ) -> Result<(), PhaseError>;
}

/// Drive `case` through every phase.
///
/// Handled failures become the returned [`CaseResult`]; only an unexpected
/// error is returned as `Err`.
pub fn run_case<S: CaseStages + ?Sized>(
    stages: &mut S,
    case: &TestCase,
    run_dir: &Path,
) -> Result<CaseResult, RunError> {
    let mut timing = Timing::new();
    phase_span("start").in_scope(|| tracing::info!("Start running case"));

    for phase in Phase::TIMED {
        let outcome = phase_span(phase.name()).in_scope(|| {
            time_step(phase.name(), &mut timing, || stages.execute(phase, case, run_dir))
        });
        if let Some(result) = settle(outcome, &mut timing)? {
            return Ok(result);
        }
    }

    let outcome = phase_span(Phase::Compare.name())
        .in_scope(|| stages.compare(case, run_dir, &mut timing));
    if let Some(result) = settle(outcome, &mut timing)? {
        return Ok(result);
    }

    tracing::info!("Case done");
    Ok(CaseResult::success(timing))
}

/// `Some` result when the phase ended the case
fn settle(
    outcome: Result<(), PhaseError>,
    timing: &mut Timing,
) -> Result<Option<CaseResult>, RunError> {
    match outcome {
        Ok(()) => Ok(None),
        Err(PhaseError::Failed(failure)) => {
            tracing::error!("{}", failure.reason);
            Ok(Some(CaseResult::failed(failure, std::mem::take(timing))))
        },
        Err(PhaseError::Fatal(err)) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        case::TestCaseSpec,
        identity::IdentityRegistry,
        status::Status,
    };
    use pretty_assertions::assert_eq;
    use regtest_trace::{
        case_span,
        testing::LogCapture,
    };

    /// Records the phases it was asked to run and fails at `fail_at`
    struct Scripted {
        fail_at: Option<Phase>,
        seen: Vec<Phase>,
    }

    impl CaseStages for Scripted {
        fn execute(
            &mut self,
            phase: Phase,
            _case: &TestCase,
            _run_dir: &Path,
        ) -> Result<(), PhaseError> {
            self.seen.push(phase);
            if self.fail_at == Some(phase) {
                return Err(PhaseError::failed(Status::SimulationFail, "GAMER error"));
            }
            Ok(())
        }

        fn compare(
            &mut self,
            _case: &TestCase,
            _run_dir: &Path,
            timing: &mut Timing,
        ) -> Result<(), PhaseError> {
            self.seen.push(Phase::Compare);
            timing.insert("compare_run_comparisons".into(), 0.0);
            Ok(())
        }
    }

    fn case() -> TestCase {
        TestCaseSpec {
            name: Some("sod".into()),
            path: "Hydro/Riemann".into(),
            ..Default::default()
        }
        .build(&mut IdentityRegistry::new())
        .unwrap()
    }

    #[test]
    fn all_phases_run_in_order() {
        let mut stages = Scripted {
            fail_at: None,
            seen: Vec::new(),
        };
        let result = run_case(&mut stages, &case(), Path::new("/tmp")).unwrap();
        assert!(result.is_success());
        assert_eq!(
            stages.seen,
            vec![
                Phase::Compile,
                Phase::Prepare,
                Phase::SetInput,
                Phase::PreScript,
                Phase::Run,
                Phase::PostScript,
                Phase::Compare,
            ]
        );
        assert_eq!(
            result.timing.keys().collect::<Vec<_>>(),
            vec![
                "compile",
                "prepare",
                "set_input",
                "pre_script",
                "run",
                "post_script",
                "compare_run_comparisons",
            ]
        );
    }

    #[test]
    fn failure_keeps_timing_up_to_the_failed_phase() {
        let mut stages = Scripted {
            fail_at: Some(Phase::Run),
            seen: Vec::new(),
        };
        let result = run_case(&mut stages, &case(), Path::new("/tmp")).unwrap();
        assert_eq!(result.status, Status::SimulationFail);
        assert_eq!(result.reason, "GAMER error");
        assert_eq!(stages.seen.last(), Some(&Phase::Run));
        assert_eq!(result.timing.len(), 5);
        assert!(result.timing.contains_key("run"));
    }

    #[test]
    fn phases_are_logged_in_their_context() {
        let capture = LogCapture::start();
        let case = case();
        {
            let span = case_span(case.test_id());
            let _case = span.enter();
            let mut stages = Scripted {
                fail_at: None,
                seen: Vec::new(),
            };
            run_case(&mut stages, &case, Path::new("/tmp")).unwrap();
        }
        let records = capture.finish();
        let start = records
            .iter()
            .find(|r| r.message == "Start running case")
            .unwrap();
        assert_eq!(start.test_id.as_deref(), Some("Hydro/Riemann/sod"));
        assert_eq!(start.phase.as_deref(), Some("start"));
        let timed = records
            .iter()
            .find(|r| r.message.starts_with("Step 'set_input' took"))
            .unwrap();
        assert_eq!(timed.phase.as_deref(), Some("set_input"));
    }
}
