//! GAMER regression test runner
//!
//! Loads the case manifest, selects cases by priority and tags, runs them
//! one after the other and writes the requested reports.
//!
//! Logging is configured through `logging.toml` or `REGTEST_LOG_*`
//! variables (see `regtest_trace::LoggingConfig::load`).

mod cli;
mod manifest;

use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use cli::Args;
use manifest::Manifest;
use regtest_core::{
    Comparator,
    IdentityRegistry,
    ReferenceProvider,
    RunResults,
    RuntimeVariables,
    SUPPORTED_COMMIT,
    SimulationStages,
    TestCase,
    generate_reports,
    run_all,
    select_cases,
};
use regtest_trace::{
    LogBackbone,
    LoggingConfig,
};
use std::{
    path::Path,
    process::{
        Command,
        ExitCode,
    },
};

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let manifest = Manifest::load(&args.manifest_path())?;
    let rtvars = RuntimeVariables::new(args.settings(manifest.remote.clone()))
        .context("invalid runtime settings")?;
    let cases = manifest.build_cases(&mut IdentityRegistry::new())?;
    let cases = select_cases(cases, rtvars.priority(), rtvars.tags());

    let mut backbone = LogBackbone::init(&LoggingConfig::load(), rtvars.output())
        .context("initializing logging")?;
    let outcome = run(&rtvars, &cases);
    let report = backbone.shutdown();
    if report.dropped > 0 {
        eprintln!("{} log records were dropped under backpressure", report.dropped);
    }

    let results = outcome?;
    let all_passed = results.values().all(|result| result.is_success());
    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run(
    rtvars: &RuntimeVariables,
    cases: &[TestCase],
) -> Result<RunResults> {
    log_header(rtvars, cases);

    let provider = ReferenceProvider::from_runtime(rtvars)
        .context("connecting to the reference store")?;
    let mut stages = SimulationStages::new(rtvars, Comparator::from_runtime(rtvars, provider));

    tracing::info!("Regression test start.");
    let results = run_all(&mut stages, cases, &rtvars.run_root())?;
    tracing::info!("Regression test done.");

    generate_reports(rtvars.reports(), rtvars, &results);
    Ok(results)
}

fn log_header(
    rtvars: &RuntimeVariables,
    cases: &[TestCase],
) {
    let commit = current_commit(rtvars.root());
    tracing::info!("Recording the commit version.");
    tracing::info!("GAMER      version   : {}", commit);
    if commit != SUPPORTED_COMMIT {
        tracing::warn!("Regression test may not fully support this GAMER version!");
    }

    tracing::info!("Record all arguments have been set.");
    for (name, value) in rtvars.describe() {
        tracing::info!("{:<20} : {}", name, value);
    }

    let mut ids: Vec<_> = cases.iter().map(TestCase::test_id).collect();
    ids.sort_unstable();
    tracing::info!("Test to be run       : {}", ids.join(" "));
}

/// Commit checked out in `root`, or `UNKNOWN`
fn current_commit(root: &Path) -> String {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(root)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|commit| commit.trim().to_string())
        .filter(|commit| !commit.is_empty())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
