//! Output format validation tests.
//!
//! Tests JSON/JSONL output format correctness and required field presence.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::Path;

use assert_cmd::Command;
use bubble_grade_core::domain::CornerRole;
use bubble_grade_test_support::SyntheticSheetBuilder;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn bubble_grade(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bubble-grade").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("HOME", dir);
    cmd
}

/// One good sheet (`a.png`) and one without its top-left marker (`b.png`).
fn mixed_batch() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    SyntheticSheetBuilder::new(3)
        .pattern("ABC")
        .build_gray()
        .save(dir.path().join("a.png"))
        .unwrap();
    SyntheticSheetBuilder::new(3)
        .without_marker(CornerRole::TopLeft)
        .build_gray()
        .save(dir.path().join("b.png"))
        .unwrap();
    dir
}

fn run(dir: &Path, extra: &[&str]) -> String {
    let output = bubble_grade(dir)
        .args(["--answers", "ABC"])
        .args(extra)
        .arg(".")
        .output()
        .unwrap();
    String::from_utf8(output.stdout).unwrap()
}

// === JSONL Format Tests ===

#[test]
fn test_jsonl_format_single_object_per_line() {
    let dir = mixed_batch();
    let stdout = run(dir.path(), &["--format", "jsonl"]);

    let lines: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let value: Value = serde_json::from_str(line).unwrap();
        assert!(value.is_object(), "JSONL line should be an object: {line}");
    }
}

#[test]
fn test_jsonl_is_default() {
    let dir = mixed_batch();
    let stdout = run(dir.path(), &[]);
    assert!(stdout.starts_with('{'));
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn test_jsonl_ignores_pretty() {
    let dir = mixed_batch();
    let stdout = run(dir.path(), &["--pretty"]);
    assert_eq!(stdout.lines().count(), 2);
}

// === JSON Array Format Tests ===

#[test]
fn test_json_format_is_single_array() {
    let dir = mixed_batch();
    let stdout = run(dir.path(), &["--format", "json"]);

    let value: Value = serde_json::from_str(&stdout).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(stdout.trim().lines().count(), 1);
}

#[test]
fn test_json_pretty_format() {
    let dir = mixed_batch();
    let stdout = run(dir.path(), &["--format", "json", "--pretty"]);

    assert!(stdout.lines().count() > 2);
    assert!(stdout.contains("\n  {"));
    let value: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 2);
}

#[test]
fn test_json_empty_array_when_all_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

    bubble_grade(dir.path())
        .args(["--answers", "ABC", "--format", "json", "broken.png"])
        .assert()
        .code(1)
        .stdout("[]\n");
}

// === Field Presence Tests ===

#[test]
fn test_graded_report_fields() {
    let dir = mixed_batch();
    let stdout = run(dir.path(), &["--format", "json"]);
    let reports: Value = serde_json::from_str(&stdout).unwrap();
    let report = &reports[0];

    assert_eq!(report["path"], "./a.png");
    assert!(report["timestamp"].as_str().unwrap().contains('T'));
    assert_eq!(report["dimensions"]["width"], 600);
    assert_eq!(report["status"], "graded");

    let result = &report["result"];
    assert_eq!(result["student_id"], "a");
    assert_eq!(result["score"], 100);
    assert_eq!(result["total"], 3);
    assert_eq!(result["correct"], 3);
    assert_eq!(result["incorrect"], 0);
    assert_eq!(result["unanswered"], 0);
    assert_eq!(result["multiple_marked"], 0);

    let question = &result["questions"][0];
    assert_eq!(question["question"], 1);
    assert_eq!(question["expected"], "A");
    assert_eq!(question["detected"], "A");
    assert_eq!(question["status"], "correct");
    assert!(question["confidence"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_rejected_report_fields() {
    let dir = mixed_batch();
    let stdout = run(dir.path(), &["--format", "json"]);
    let reports: Value = serde_json::from_str(&stdout).unwrap();
    let report = &reports[1];

    assert_eq!(report["path"], "./b.png");
    assert_eq!(report["status"], "rejected");
    assert_eq!(report["kind"], "insufficient_markers");
    assert!(report["reason"]
        .as_str()
        .unwrap()
        .contains("insufficient markers"));
    assert!(report.get("result").is_none());
}

#[test]
fn test_unanswered_question_has_null_detection() {
    let dir = tempfile::tempdir().unwrap();
    SyntheticSheetBuilder::new(3)
        .pattern("A-C")
        .build_gray()
        .save(dir.path().join("c.png"))
        .unwrap();

    let output = bubble_grade(dir.path())
        .args(["--answers", "ABC", "c.png"])
        .output()
        .unwrap();
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();

    let question = &report["result"]["questions"][1];
    assert!(question["detected"].is_null());
    assert_eq!(question["status"], "unanswered");
}

#[test]
fn test_quiet_suppresses_stderr_lines() {
    let dir = mixed_batch();
    bubble_grade(dir.path())
        .args(["--answers", "ABC", "--quiet", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("rejected").not());
}
