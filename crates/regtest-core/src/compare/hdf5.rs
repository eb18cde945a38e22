//! Binary snapshots compared through the external compare tool

use crate::process::ProcessCommand;
use regex::Regex;
use std::{
    fs,
    path::Path,
    process::Command,
    sync::LazyLock,
};

/// Report written by the compare tool, next to the tool binary
pub const COMPARE_REPORT: &str = "compare_result";
/// Teed output of the compare tool, next to the tool binary
pub const COMPARE_LOG: &str = "compare.log";

const UNKNOWN: &str = "UNKNOWN";

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)";\s*$"#).unwrap_or_else(|_| unreachable!()));

/// Whether a compare report lists any mismatch.
///
/// Lines starting with `#` and blank lines are comments.
pub fn report_has_mismatch(report: &str) -> bool {
    report
        .split_inclusive('\n')
        .any(|line| !line.starts_with('#') && !line.starts_with('\n'))
}

/// Identifying metadata stored in a snapshot header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub git_branch: String,
    pub git_commit: String,
    pub unique_id: String,
}

impl Default for KeyInfo {
    fn default() -> Self {
        Self {
            git_branch: UNKNOWN.into(),
            git_commit: UNKNOWN.into(),
            unique_id: UNKNOWN.into(),
        }
    }
}

impl KeyInfo {
    /// Extract the fields from an `h5dump` listing of `/Info/KeyInfo`.
    pub fn from_dump(dump: &str) -> Self {
        let mut names = Vec::new();
        let mut values = Vec::new();
        let mut in_type = false;
        let mut in_data = false;
        for line in dump.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with("DATATYPE") {
                in_type = true;
            } else if trimmed.starts_with("DATASPACE") {
                in_type = false;
            } else if trimmed.starts_with("(0): {") {
                in_data = true;
            } else if in_data && trimmed.starts_with('}') {
                break;
            } else if in_type {
                if let Some(caps) = FIELD_NAME.captures(trimmed) {
                    names.push(caps[1].to_string());
                }
            } else if in_data && !trimmed.is_empty() {
                values.push(
                    trimmed
                        .trim_end_matches(',')
                        .trim_matches('"')
                        .to_string(),
                );
            }
        }
        let mut info = KeyInfo::default();
        if names.len() != values.len() {
            return info;
        }
        for (name, value) in names.into_iter().zip(values) {
            match name.as_str() {
                "GitBranch" => info.git_branch = value,
                "GitCommit" => info.git_commit = value,
                "UniqueDataID" => info.unique_id = value,
                _ => {},
            }
        }
        info
    }

    /// Read the header of `file` with `h5dump`; all fields are
    /// `UNKNOWN` when that is not possible.
    pub fn probe(file: &Path) -> Self {
        let output = Command::new("h5dump")
            .args(["-d", "/Info/KeyInfo"])
            .arg(file)
            .output();
        match output {
            Ok(output) if output.status.success() => {
                Self::from_dump(&String::from_utf8_lossy(&output.stdout))
            },
            _ => KeyInfo::default(),
        }
    }
}

/// Run the compare tool on a pair of snapshots; `true` when they agree.
pub fn compare_hdf5(
    tool: &Path,
    result: &Path,
    expect: &Path,
    tolerance: f64,
) -> bool {
    tracing::info!("Comparing HDF5: {} <--> {}", result.display(), expect.display());
    let tool_dir = tool.parent().unwrap_or(Path::new("."));
    let report = tool_dir.join(COMPARE_REPORT);
    let log = tool_dir.join(COMPARE_LOG);
    for stale in [&report, &log] {
        if stale.exists()
            && let Err(err) = fs::remove_file(stale)
        {
            tracing::warn!("Could not remove {}: {}", stale.display(), err);
        }
    }

    let command = ProcessCommand::new([
        tool.display().to_string(),
        "-i".into(),
        result.display().to_string(),
        "-j".into(),
        expect.display().to_string(),
        "-o".into(),
        report.display().to_string(),
        "-e".into(),
        format!("{:?}", tolerance),
        "-c".into(),
        "-m".into(),
    ])
    .tee_stdout(&log)
    .unchecked();
    match command.run() {
        Ok(status) if status.success() => {},
        Ok(status) => {
            tracing::error!("Compare tool exited with {}", status);
            return false;
        },
        Err(err) => {
            tracing::error!("Compare tool failed: {}", err);
            return false;
        },
    }

    let mismatch = match fs::read_to_string(&report) {
        Ok(content) => report_has_mismatch(&content),
        Err(err) => {
            tracing::error!("Could not read {}: {}", report.display(), err);
            true
        },
    };
    if mismatch {
        log_mismatch(result, expect);
    }
    tracing::info!("Comparing HDF5 done.");
    !mismatch
}

fn log_mismatch(
    result: &Path,
    expect: &Path,
) {
    let result_info = KeyInfo::probe(result);
    let expect_info = KeyInfo::probe(expect);
    let (result_name, expect_name) = (result.display().to_string(), expect.display().to_string());
    let width = result_name.len().max(expect_name.len()).max(50);
    let row = |label: &str, expect: &str, result: &str| {
        let line = format!("{}: {:<width$} {:<width$}", label, expect, result, width = width);
        tracing::error!("{}", line);
    };
    tracing::error!("Result data is not identical to expect data");
    tracing::error!("Error is greater than expected.");
    row("Type      ", "Expect", "Result");
    row("File name ", &expect_name, &result_name);
    row("Git Branch", &expect_info.git_branch, &result_info.git_branch);
    row("Git Commit", &expect_info.git_commit, &result_info.git_commit);
    row("Unique ID ", &expect_info.unique_id, &result_info.unique_id);
}
