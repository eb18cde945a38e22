mod common;

use common::{
    write_executable,
    write_file,
};
use regtest_core::compare::{
    COMPARE_REPORT,
    compare_hdf5,
    compare_text,
};
use std::path::{
    Path,
    PathBuf,
};

fn table(
    dir: &Path,
    name: &str,
    content: &str,
) -> PathBuf {
    let path = dir.join(name);
    write_file(&path, content);
    path
}

#[test]
fn text_tables_agree_within_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let a = table(dir.path(), "a", "1.0 2.0\n3.0 4.0\n");
    let b = table(dir.path(), "b", "1.0 2.0\n3.0 4.0\n");
    assert!(compare_text(&a, &b, 0.0));

    let row = table(dir.path(), "row", "1.0 2.0\n");
    let shifted = table(dir.path(), "shifted", "1.0 2.05\n");
    assert!(!compare_text(&row, &shifted, 0.01));
    assert!(compare_text(&row, &shifted, 0.1));
}

#[test]
fn text_shapes_must_match() {
    let dir = tempfile::tempdir().unwrap();
    let two = table(dir.path(), "two", "1.0 2.0\n");
    let three = table(dir.path(), "three", "1.0 2.0 3.0\n");
    assert!(!compare_text(&two, &three, 1e9));
}

#[test]
fn text_files_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let a = table(dir.path(), "a", "1.0\n");
    assert!(!compare_text(&a, &dir.path().join("missing"), 1.0));
    assert!(!compare_text(&dir.path().join("missing"), &a, 1.0));
}

/// A compare tool writing `report` to its `-o` argument and exiting with `code`
fn fake_tool(
    dir: &Path,
    report: &str,
    code: i32,
) -> PathBuf {
    let tool = dir.join("tools/abc/GAMER_CompareData");
    let script = format!(
        "#!/bin/sh\n\
         while [ $# -gt 0 ]; do\n\
         if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n\
         shift\n\
         done\n\
         printf '{}' > \"$out\"\n\
         exit {}\n",
        report, code
    );
    write_executable(&tool, &script);
    tool
}

fn snapshots(dir: &Path) -> (PathBuf, PathBuf) {
    (
        table(dir, "run/Data_000001", "result"),
        table(dir, "ref/Data_000001", "expect"),
    )
}

#[test]
fn a_report_of_comments_passes() {
    let dir = tempfile::tempdir().unwrap();
    let tool = fake_tool(dir.path(), "# Field Error\\n\\n# done\\n", 0);
    let (result, expect) = snapshots(dir.path());

    assert!(compare_hdf5(&tool, &result, &expect, 1e-10));
    assert!(tool.parent().unwrap().join(COMPARE_REPORT).is_file());
}

#[test]
fn any_other_report_line_fails() {
    let dir = tempfile::tempdir().unwrap();
    let tool = fake_tool(dir.path(), "# Field Error\\nDens 1 2 3.0e-3\\n", 0);
    let (result, expect) = snapshots(dir.path());

    assert!(!compare_hdf5(&tool, &result, &expect, 1e-10));
}

#[test]
fn a_non_zero_exit_fails_even_with_an_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let tool = fake_tool(dir.path(), "", 1);
    let (result, expect) = snapshots(dir.path());

    assert!(!compare_hdf5(&tool, &result, &expect, 1e-10));
}
