//! Run-metadata report (`Record__Note`) parsing and diffing
//!
//! The report is a sequence of named sections. A line containing `*****`
//! toggles between a section title and its body; body lines are
//! `name ... value` pairs. The comparison is diagnostic only.

use indexmap::IndexMap;
use std::{
    fs,
    io,
    path::Path,
};

const DELIMITER: &str = "*****";
const EMPTY: &str = "EMPTY";

/// Sections whose content changes from run to run
const VOLATILE_SECTIONS: [&str; 5] = [
    "Flag Criterion (# of Particles per Patch)",
    "Flag Criterion (Lohner Error Estimator)",
    "Cell Size and Scale (scale = number of cells at the finest level)",
    "Compilation Time",
    "Current Time",
];

/// Sections after which nothing is compared
const TRAILER_SECTIONS: [&str; 2] = ["OpenMP Diagnosis", "Device Diagnosis"];

/// Parameters by section, in report order
pub type NoteParameters = IndexMap<String, IndexMap<String, String>>;

pub fn parse_note(content: &str) -> NoteParameters {
    let mut params = NoteParameters::new();
    let mut in_section = false;
    let mut current = String::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.contains(DELIMITER) {
            in_section = !in_section;
            continue;
        }
        if !in_section {
            current = line.trim_end().to_string();
            if TRAILER_SECTIONS.contains(&current.as_str()) {
                break;
            }
            params.insert(current.clone(), IndexMap::new());
            continue;
        }
        if VOLATILE_SECTIONS.contains(&current.as_str()) {
            continue;
        }
        let tokens: Vec<_> = line.split_whitespace().collect();
        if let Some((value, key)) = tokens.split_last()
            && let Some(section) = params.get_mut(&current)
        {
            section.insert(key.join(" "), value.to_string());
        }
    }
    params
}

pub fn read_note(path: &Path) -> io::Result<NoteParameters> {
    Ok(parse_note(&fs::read_to_string(path)?))
}

/// One differing parameter: its result and expected values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDiff {
    pub key: String,
    pub result: String,
    pub expect: String,
}

/// Parameters that were added, removed or changed between two reports.
///
/// A side lacking a parameter shows `EMPTY`. Keys are reported once, at the
/// position of their first difference, with the values of the last one.
pub fn diff_notes(
    result: &NoteParameters,
    expect: &NoteParameters,
) -> Vec<NoteDiff> {
    let mut diffs: IndexMap<String, (String, String)> = IndexMap::new();
    let mut record = |key: &str, result: &str, expect: &str| {
        diffs.insert(key.to_string(), (result.to_string(), expect.to_string()));
    };
    let empty = IndexMap::new();
    for (section, params) in result {
        let other = expect.get(section).unwrap_or(&empty);
        for (key, value) in params {
            match other.get(key) {
                None => record(key, value, EMPTY),
                Some(expected) if expected != value => record(key, value, expected),
                Some(_) => {},
            }
        }
        for (key, value) in other {
            if !params.contains_key(key) {
                record(key, EMPTY, value);
            }
        }
    }
    for (section, params) in expect {
        if result.contains_key(section) {
            continue;
        }
        for (key, value) in params {
            record(key, EMPTY, value);
        }
    }
    diffs
        .into_iter()
        .map(|(key, (result, expect))| NoteDiff {
            key,
            result,
            expect,
        })
        .collect()
}

/// Log the differences of two reports at debug level.
///
/// Never fails: a missing report skips the comparison.
pub fn compare_note(
    result: &Path,
    expect: &Path,
) {
    if !result.is_file() || !expect.is_file() {
        return;
    }
    tracing::info!("Comparing Record__Note: {} <-> {}", result.display(), expect.display());
    let (result_params, expect_params) = match (read_note(result), read_note(expect)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!("Could not read Record__Note: {}", err);
            return;
        },
    };
    let row = |key: &str, result: &str, expect: &str| {
        let line = format!("{:<30} | {:>40} | {:>40} |", key, result, expect);
        tracing::debug!("{}", line);
    };
    row("Parameter name", "result parameter", "expect parameter");
    for diff in diff_notes(&result_params, &expect_params) {
        row(&diff.key, &diff.result, &diff.expect);
    }
    tracing::info!("Comparison of Record__Note done.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOTE: &str = "\

Makefile Options (numerical schemes)
***********************************************************************
MODEL                           HYDRO
FLU_SCHEME                      MHM_RP
***********************************************************************

Compilation Time
***********************************************************************
Compilation Time                May  6 2024 12:00:00
***********************************************************************

Other Options
***********************************************************************
OPT__VERBOSE                    0
***********************************************************************

OpenMP Diagnosis
***********************************************************************
OMP__NUM_THREADS                16
***********************************************************************
";

    #[test]
    fn sections_are_parsed_until_the_trailer() {
        let params = parse_note(NOTE);
        assert_eq!(
            params.keys().collect::<Vec<_>>(),
            vec!["Makefile Options (numerical schemes)", "Compilation Time", "Other Options"]
        );
        assert_eq!(params["Makefile Options (numerical schemes)"]["FLU_SCHEME"], "MHM_RP");
        assert!(params["Compilation Time"].is_empty());
    }

    #[test]
    fn multi_word_keys_keep_their_spaces() {
        let params = parse_note("Limits\n*****\nMax number of patches   1000\n*****\n");
        assert_eq!(params["Limits"]["Max number of patches"], "1000");
    }

    #[test]
    fn diff_reports_added_removed_and_changed() {
        let result = parse_note(NOTE);
        let expect = parse_note(
            &NOTE
                .replace("MHM_RP", "CTU")
                .replace("OPT__VERBOSE", "OPT__INIT"),
        );
        assert_eq!(
            diff_notes(&result, &expect),
            vec![
                NoteDiff {
                    key: "FLU_SCHEME".into(),
                    result: "MHM_RP".into(),
                    expect: "CTU".into(),
                },
                NoteDiff {
                    key: "OPT__VERBOSE".into(),
                    result: "0".into(),
                    expect: EMPTY.into(),
                },
                NoteDiff {
                    key: "OPT__INIT".into(),
                    result: EMPTY.into(),
                    expect: "0".into(),
                },
            ]
        );
    }

    #[test]
    fn repeated_keys_report_the_last_difference() {
        let result = parse_note("A\n*****\nNX 16\n*****\nB\n*****\nNX 32\nNY 8\n*****\n");
        let expect = parse_note("A\n*****\nNX 8\n*****\nB\n*****\nNX 64\nNY 4\n*****\n");
        assert_eq!(
            diff_notes(&result, &expect),
            vec![
                NoteDiff {
                    key: "NX".into(),
                    result: "32".into(),
                    expect: "64".into(),
                },
                NoteDiff {
                    key: "NY".into(),
                    result: "8".into(),
                    expect: "4".into(),
                },
            ]
        );
    }

    #[test]
    fn identical_reports_have_no_diff() {
        let params = parse_note(NOTE);
        assert!(diff_notes(&params, &params).is_empty());
    }
}
