//! Regression test orchestration for the GAMER simulation code.
//!
//! Cases are built from declarative [`TestCaseSpec`]s, run one after the
//! other through the [`pipeline`] in isolated run directories, and compared
//! against reference data staged by a [`ReferenceProvider`]. The collected
//! [`RunResults`] feed the [`report`] generators.

pub mod build_cache;
pub mod case;
pub mod compare;
pub mod error;
pub mod identity;
pub mod input_file;
pub mod pipeline;
pub mod process;
pub mod reference;
pub mod report;
pub mod run_loop;
pub mod runtime;
pub mod status;
pub mod timing;

pub use crate::{
    build_cache::{
        BuildCommands,
        CompareToolCache,
    },
    case::{
        ConfigValue,
        FileType,
        Priority,
        TestCase,
        TestCaseSpec,
        TestReference,
        select_cases,
    },
    compare::Comparator,
    error::{
        PhaseError,
        RunError,
    },
    identity::IdentityRegistry,
    pipeline::{
        CaseStages,
        Phase,
        SimulationStages,
        run_case,
    },
    reference::ReferenceProvider,
    report::generate_reports,
    run_loop::run_all,
    runtime::{
        RemoteSettings,
        RuntimeSettings,
        RuntimeVariables,
        SUPPORTED_COMMIT,
    },
    status::{
        CaseResult,
        RunResults,
        Status,
        StepFailure,
        Timing,
    },
};
