// ScenarioSleuth - tests/e2e_run.rs
//
// End-to-end tests for the full analysis pipeline.
//
// These tests exercise the real filesystem, real scenario loading, real
// walkdir traversal, the rayon worker pool, and the CSV sink. Each run
// writes its artifact into a temporary directory which is then parsed back
// with the csv crate.

use scenariosleuth::app::controller::{run_analysis, RunRequest};
use scenariosleuth::app::coordinator::CoordinatorConfig;
use scenariosleuth::core::model::{CancelToken, RunOutcome, RunProgress};
use std::fs;
use std::path::{Path, PathBuf};

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to the on-disk fixture files.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn request(log_dir: &Path, scenario_file: &Path, output_dir: &Path) -> RunRequest {
    RunRequest {
        log_dir: log_dir.to_path_buf(),
        scenario_file: scenario_file.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        coordinator: CoordinatorConfig {
            workers: 4,
            ..Default::default()
        },
    }
}

/// Parse an artifact, returning header and rows sorted for stable comparison.
fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let mut rows: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    rows.sort();
    (header, rows)
}

fn expect_success(outcome: RunOutcome) -> PathBuf {
    match outcome {
        RunOutcome::Success(path) => path,
        other => panic!("expected success, got {other:?}"),
    }
}

fn write_single_scenario(dir: &Path, mandatory: &[&str], logic: &str, include_fails: bool) -> PathBuf {
    let path = dir.join("scenario.json");
    let doc = serde_json::json!({
        "scenarios": [{
            "name": "job",
            "start_pattern": "start",
            "end_pattern": "end",
            "lines_between_start_to_end": mandatory,
            "mandatory_logic": logic,
            "include_fails": include_fails,
            "success_message": "Success",
            "fail_message": "Failure"
        }]
    });
    fs::write(&path, doc.to_string()).unwrap();
    path
}

/// A temp workspace holding one `logs/app.log` with the given lines.
fn workspace(lines: &[&str]) -> (tempfile::TempDir, PathBuf) {
    let work = tempfile::tempdir().unwrap();
    let logs = work.path().join("logs");
    fs::create_dir(&logs).unwrap();
    fs::write(logs.join("app.log"), lines.join("\n") + "\n").unwrap();
    (work, logs)
}

// =============================================================================
// Fixture run
// =============================================================================

#[test]
fn e2e_fixture_run_produces_expected_rows() {
    let out = tempfile::tempdir().unwrap();
    let outcome = run_analysis(
        &request(&fixture("logs"), &fixture("scenario.json"), out.path()),
        &CancelToken::new(),
        |_| {},
    );
    let output = expect_success(outcome);

    let name = output.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("output_") && name.ends_with(".csv"), "{name}");

    let (header, rows) = read_csv(&output);
    assert_eq!(
        header,
        vec![
            "FilePath",
            "Scenario",
            "FirstLineNo",
            "FirstLine",
            "MandatoryPatternLineNos",
            "MandatoryPatternLines",
            "SecondLineNo",
            "SecondLine",
            "Result"
        ]
    );

    // notes.txt is not a *.log file; the failed login is suppressed.
    assert_eq!(rows.len(), 4, "{rows:#?}");
    assert!(rows.iter().all(|r| !r[0].ends_with("notes.txt")));

    let backup_ok: Vec<_> = rows
        .iter()
        .filter(|r| r[1] == "Backup job" && r[8] == "Backup OK")
        .collect();
    assert_eq!(backup_ok.len(), 2);
    // Patterns declared Snapshot-then-Upload; lines still ascend.
    assert!(backup_ok.iter().all(|r| r[4] == "2, 3"));

    let worker = backup_ok
        .iter()
        .find(|r| r[0].ends_with("worker.log"))
        .expect("worker.log row");
    assert_eq!(
        worker[5],
        "2024-05-01T11:00:02 INFO Upload complete; 2024-05-01T11:00:03 INFO Snapshot created"
    );

    let incomplete = rows
        .iter()
        .find(|r| r[8] == "Backup incomplete")
        .expect("incomplete backup row");
    assert_eq!((incomplete[2].as_str(), incomplete[4].as_str(), incomplete[6].as_str()), ("5", "6", "7"));

    let logins: Vec<_> = rows.iter().filter(|r| r[1] == "Login").collect();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0][8], "Login OK");
    assert_eq!(logins[0][2], "8");
    assert_eq!(logins[0][6], "10");
}

// =============================================================================
// Matching semantics through the whole pipeline
// =============================================================================

#[test]
fn e2e_or_scenario_single_success_record() {
    let (work, logs) = workspace(&["A start", "mid X", "B end"]);
    let scenario = write_single_scenario(work.path(), &["X"], "OR", true);

    let output = expect_success(run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    ));
    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 1);
    let r = &rows[0];
    assert_eq!(
        (&r[1][..], &r[2][..], &r[3][..], &r[4][..], &r[5][..], &r[6][..], &r[7][..], &r[8][..]),
        ("job", "1", "A start", "2", "mid X", "3", "B end", "Success")
    );
}

#[test]
fn e2e_or_scenario_without_mandatory_match_fails() {
    let (work, logs) = workspace(&["A start", "mid X", "B end"]);
    let scenario = write_single_scenario(work.path(), &["Y"], "OR", true);

    let output = expect_success(run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    ));
    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][4], "");
    assert_eq!(rows[0][5], "");
    assert_eq!(rows[0][8], "Failure");
}

#[test]
fn e2e_and_scenario_requires_every_pattern() {
    let (work, logs) = workspace(&["A start", "mid X", "B end"]);
    let scenario = write_single_scenario(work.path(), &["X", "Y"], "AND", true);

    let output = expect_success(run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    ));
    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][4], "2");
    assert_eq!(rows[0][8], "Failure");
}

#[test]
fn e2e_and_with_empty_list_always_succeeds() {
    let (work, logs) = workspace(&["start", "end", "start", "noise", "end"]);
    let scenario = write_single_scenario(work.path(), &[], "AND", true);

    let output = expect_success(run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    ));
    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r[8] == "Success"));
}

#[test]
fn e2e_include_fails_false_drops_failed_windows() {
    let (work, logs) = workspace(&["start", "X", "end", "start", "end", "start", "no close"]);
    let scenario = write_single_scenario(work.path(), &["X"], "or", false);

    let output = expect_success(run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    ));
    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][8], "Success");
}

#[test]
fn e2e_empty_end_pattern_closes_on_start_line() {
    let (work, logs) = workspace(&["noise", "start X", "trailing X"]);
    let scenario = work.path().join("scenario.json");
    fs::write(
        &scenario,
        r#"{"scenarios": [{"name": "instant", "start_pattern": "start",
            "end_pattern": "", "lines_between_start_to_end": ["X"],
            "success_message": "Success", "fail_message": "Failure"}]}"#,
    )
    .unwrap();

    let output = expect_success(run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    ));
    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!((&rows[0][2][..], &rows[0][6][..]), ("2", "2"));
    assert_eq!(rows[0][8], "Success");
}

#[test]
fn e2e_deeply_nested_log_is_scanned() {
    let work = tempfile::tempdir().unwrap();
    let logs = work.path().join("logs");
    let mut deep = logs.clone();
    for level in 0..41 {
        deep = deep.join(format!("d{level}"));
    }
    fs::create_dir_all(&deep).unwrap();
    fs::write(deep.join("deep.log"), "start\nX\nend\n").unwrap();
    let scenario = write_single_scenario(work.path(), &["X"], "OR", true);

    let output = expect_success(run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    ));
    let (_, rows) = read_csv(&output);
    assert_eq!(rows.len(), 1);
    assert!(rows[0][0].ends_with("deep.log"), "{}", rows[0][0]);
    assert_eq!(rows[0][8], "Success");
}

// =============================================================================
// Fatal errors
// =============================================================================

#[test]
fn e2e_empty_directory_fails_before_output_exists() {
    let work = tempfile::tempdir().unwrap();
    let logs = work.path().join("logs");
    fs::create_dir(&logs).unwrap();
    let out = work.path().join("out");
    fs::create_dir(&out).unwrap();
    let scenario = write_single_scenario(work.path(), &["X"], "OR", true);

    let mut events = Vec::new();
    let outcome = run_analysis(&request(&logs, &scenario, &out), &CancelToken::new(), |e| {
        events.push(e)
    });

    match outcome {
        RunOutcome::Failed(message) => {
            assert!(message.contains("No log files found"), "{message}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(events.last(), Some(RunProgress::Failed { .. })));
    assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn e2e_missing_required_field_is_fatal() {
    let (work, logs) = workspace(&["start", "end"]);
    let scenario = work.path().join("scenario.json");
    fs::write(
        &scenario,
        r#"{"scenarios": [{"name": "x", "start_pattern": "start",
            "lines_between_start_to_end": [], "success_message": "ok", "fail_message": "no"}]}"#,
    )
    .unwrap();

    let outcome = run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    );
    match outcome {
        RunOutcome::Failed(message) => assert!(message.contains("end_pattern"), "{message}"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn e2e_invalid_regex_is_fatal() {
    let (work, logs) = workspace(&["start", "end"]);
    let scenario = work.path().join("scenario.json");
    fs::write(
        &scenario,
        r#"{"scenarios": [{"name": "broken", "start_pattern": "([a-z",
            "end_pattern": "end", "lines_between_start_to_end": [], "use_regex": true,
            "success_message": "ok", "fail_message": "no"}]}"#,
    )
    .unwrap();

    let outcome = run_analysis(
        &request(&logs, &scenario, work.path()),
        &CancelToken::new(),
        |_| {},
    );
    match outcome {
        RunOutcome::Failed(message) => assert!(message.contains("broken"), "{message}"),
        other => panic!("expected failure, got {other:?}"),
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Many files, each with many windows, so a cancelled run stops early.
fn large_workspace() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let work = tempfile::tempdir().unwrap();
    let logs = work.path().join("logs");
    fs::create_dir(&logs).unwrap();

    let mut body = String::new();
    for i in 0..2_000 {
        body.push_str(&format!("start {i}\nstep X {i}\nend {i}\n"));
    }
    for f in 0..40 {
        fs::write(logs.join(format!("f{f:02}.log")), &body).unwrap();
    }
    let scenario = write_single_scenario(work.path(), &["X"], "OR", true);
    (work, logs, scenario)
}

#[test]
fn e2e_cancelled_run_leaves_wellformed_partial_output() {
    let (work, logs, scenario) = large_workspace();

    let full_out = work.path().join("full");
    fs::create_dir(&full_out).unwrap();
    let full = expect_success(run_analysis(
        &request(&logs, &scenario, &full_out),
        &CancelToken::new(),
        |_| {},
    ));
    let (_, full_rows) = read_csv(&full);
    assert_eq!(full_rows.len(), 40 * 2_000);

    let cut_out = work.path().join("cut");
    fs::create_dir(&cut_out).unwrap();
    let cancel = CancelToken::new();
    let mut last = None;
    let outcome = run_analysis(&request(&logs, &scenario, &cut_out), &cancel, |e| {
        if matches!(e, RunProgress::UnitCompleted { completed: 1, .. }) {
            cancel.cancel();
        }
        last = Some(e);
    });

    assert_eq!(outcome, RunOutcome::Cancelled);
    let Some(RunProgress::Cancelled { output, summary }) = last else {
        panic!("expected Cancelled terminal event");
    };

    // Every row parses with all nine columns (csv errors on ragged rows).
    let (_, rows) = read_csv(&output);
    assert!(rows.iter().all(|r| r.len() == 9));
    assert!(rows.len() <= full_rows.len());
    assert_eq!(rows.len(), summary.rows_written);
    assert!(summary.units_completed <= summary.units_total);
}
