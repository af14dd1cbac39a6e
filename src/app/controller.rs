// ScenarioSleuth - app/controller.rs
//
// Run lifecycle management. Orchestrates one analysis run end to end:
// scenario loading -> planning (discovery) -> output artifact -> scan -> close.
//
// Architecture:
//   - `run_analysis` performs a run synchronously, reporting `RunProgress`
//     events through a callback, and returns the terminal `RunOutcome`.
//   - `RunManager` lives on the presentation thread; it runs `run_analysis`
//     on a background thread and relays events over an mpsc channel.
//   - A shared `CancelToken` lets the presentation layer stop the run
//     cooperatively.
//
// Guarantees:
//   - Fatal config/discovery errors are reported before the output file is
//     created.
//   - Once created, the artifact is always flushed and closed before the
//     terminal event is sent, including on cancellation and failure.
//   - Exactly one terminal event (Completed / Cancelled / Failed) per run.

use crate::app::coordinator::{self, CoordinatorConfig, CoordinatorReport, RunState};
use crate::app::scenario_loader;
use crate::app::sink::{ResultSink, SinkReport};
use crate::core::model::{CancelToken, RunOutcome, RunProgress, RunSummary};
use crate::util::constants;
use crate::util::error::SleuthError;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

// =============================================================================
// Request
// =============================================================================

/// Inputs for one analysis run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Directory tree to scan.
    pub log_dir: PathBuf,
    /// Scenario JSON file.
    pub scenario_file: PathBuf,
    /// Directory the timestamped CSV is written into.
    pub output_dir: PathBuf,
    /// Worker and discovery settings.
    pub coordinator: CoordinatorConfig,
}

/// Timestamped artifact name, e.g. `output_2024-05-01_13-45-00.csv`.
pub fn output_file_name() -> String {
    chrono::Local::now()
        .format(constants::OUTPUT_FILE_NAME_FORMAT)
        .to_string()
}

// =============================================================================
// Synchronous run
// =============================================================================

/// Perform one run, reporting progress through `on_event`.
///
/// The last event passed to `on_event` is always terminal, and matches the
/// returned outcome.
pub fn run_analysis<F>(request: &RunRequest, cancel: &CancelToken, mut on_event: F) -> RunOutcome
where
    F: FnMut(RunProgress),
{
    let started = Instant::now();
    on_event(RunProgress::Started);

    match run_inner(request, cancel, started, &mut on_event) {
        Ok((output, summary)) if cancel.is_cancelled() => {
            tracing::info!(
                output = %output.display(),
                rows = summary.rows_written,
                "Analysis cancelled; partial output kept"
            );
            on_event(RunProgress::Cancelled { output, summary });
            RunOutcome::Cancelled
        }
        Ok((output, summary)) => {
            tracing::info!(
                output = %output.display(),
                rows = summary.rows_written,
                duration_ms = summary.duration.as_millis() as u64,
                "Analysis complete"
            );
            on_event(RunProgress::Completed {
                output: output.clone(),
                summary,
            });
            RunOutcome::Success(output)
        }
        Err(e) => {
            tracing::error!(error = %e, "Analysis failed");
            let message = e.to_string();
            on_event(RunProgress::Failed {
                error: message.clone(),
            });
            RunOutcome::Failed(message)
        }
    }
}

fn run_inner<F>(
    request: &RunRequest,
    cancel: &CancelToken,
    started: Instant,
    on_event: &mut F,
) -> Result<(PathBuf, RunSummary), SleuthError>
where
    F: FnMut(RunProgress),
{
    // -------------------------------------------------------------------------
    // Phase 1: scenarios (fatal on error, nothing created yet)
    // -------------------------------------------------------------------------
    let scenarios = scenario_loader::load_scenarios(&request.scenario_file)?;
    on_event(RunProgress::ScenariosLoaded {
        count: scenarios.len(),
    });

    // -------------------------------------------------------------------------
    // Phase 2: discovery (fatal on error, nothing created yet)
    // -------------------------------------------------------------------------
    let plan = coordinator::plan(&request.log_dir, scenarios, &request.coordinator, cancel)?;

    for message in &plan.warnings {
        on_event(RunProgress::Warning {
            message: message.clone(),
        });
    }
    on_event(RunProgress::FilesDiscovered {
        files: plan.files.len(),
        total_units: plan.total_units(),
    });

    // -------------------------------------------------------------------------
    // Phase 3: output artifact and sink
    // -------------------------------------------------------------------------
    let output = request.output_dir.join(output_file_name());
    let file = std::fs::File::create(&output).map_err(|e| SleuthError::Io {
        path: output.clone(),
        operation: "create output",
        source: e,
    })?;
    let sink = ResultSink::spawn(file, &output, cancel.clone())?;

    tracing::info!(output = %output.display(), "Output artifact created");

    // -------------------------------------------------------------------------
    // Phase 4: scan
    // -------------------------------------------------------------------------
    let state = RunState::new(cancel.clone());
    let scan_result = coordinator::execute(
        &plan,
        request.coordinator.workers,
        &sink.sender(),
        &state,
        |completed, total| on_event(RunProgress::UnitCompleted { completed, total }),
    );

    // The sink is closed whatever the scan result, so the artifact on disk
    // is complete up to its last row before anything is reported.
    let sink_result = sink.finish();
    let report = scan_result?;
    let sink_report = sink_result?;

    report_unit_failures(&report, on_event);

    Ok((
        output,
        summarise(&plan, &report, &sink_report, started.elapsed()),
    ))
}

fn report_unit_failures<F>(report: &CoordinatorReport, on_event: &mut F)
where
    F: FnMut(RunProgress),
{
    for message in &report.warnings {
        on_event(RunProgress::Warning {
            message: message.clone(),
        });
    }
    if report.units_failed > report.warnings.len() {
        on_event(RunProgress::Warning {
            message: format!(
                "{} further unit failures not shown",
                report.units_failed - report.warnings.len()
            ),
        });
    }
}

fn summarise(
    plan: &coordinator::ScanPlan,
    report: &CoordinatorReport,
    sink: &SinkReport,
    duration: Duration,
) -> RunSummary {
    RunSummary {
        files: report.files,
        scenarios: plan.scenarios.len(),
        units_total: report.units_total,
        units_completed: report.units_completed,
        units_failed: report.units_failed,
        records_emitted: report.records_emitted,
        rows_written: sink.rows_written,
        duration,
    }
}

// =============================================================================
// RunManager
// =============================================================================

/// Manages an analysis run on a background thread.
pub struct RunManager {
    /// Channel receiver for the presentation layer to poll progress messages.
    pub progress_rx: Option<mpsc::Receiver<RunProgress>>,

    /// Cancel token shared with the background thread.
    cancel: Option<CancelToken>,
}

impl RunManager {
    pub fn new() -> Self {
        Self {
            progress_rx: None,
            cancel: None,
        }
    }

    /// Start a run. Spawns a background thread immediately; progress is sent
    /// over the channel. A run that is already in progress is cancelled first.
    pub fn start_run(&mut self, request: RunRequest) {
        self.cancel_run();

        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();

        self.progress_rx = Some(rx);
        self.cancel = Some(cancel.clone());

        std::thread::spawn(move || {
            run_analysis(&request, &cancel, |event| {
                // Receiver dropped (presentation closed); keep going quietly
                // so the artifact is still closed properly.
                let _ = tx.send(event);
            });
        });

        tracing::info!("Run started");
    }

    /// Request cancellation of the running analysis.
    /// The background thread winds down and sends `RunProgress::Cancelled`.
    pub fn cancel_run(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    /// The cancel token of the current run, for wiring to an external signal.
    pub fn cancel_token(&self) -> Option<CancelToken> {
        self.cancel.clone()
    }

    /// Poll for progress messages without blocking. Returns all pending messages.
    pub fn poll_progress(&self) -> Vec<RunProgress> {
        let mut messages = Vec::new();
        if let Some(ref rx) = self.progress_rx {
            while let Ok(msg) = rx.try_recv() {
                messages.push(msg);
            }
        }
        messages
    }

    /// Block up to `timeout` for the next progress message.
    pub fn wait_progress(&self, timeout: Duration) -> Option<RunProgress> {
        self.progress_rx
            .as_ref()
            .and_then(|rx| rx.recv_timeout(timeout).ok())
    }
}

impl Default for RunManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Check whether `path` looks like a usable output directory.
pub fn validate_output_dir(path: &Path) -> Result<(), SleuthError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SleuthError::Io {
            path: path.to_path_buf(),
            operation: "open output directory",
            source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
        }),
        Err(e) => Err(SleuthError::Io {
            path: path.to_path_buf(),
            operation: "open output directory",
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_scenarios(dir: &Path) -> PathBuf {
        let path = dir.join("scenario.json");
        fs::write(
            &path,
            r#"{"scenarios": [{
                "name": "job",
                "start_pattern": "start",
                "end_pattern": "end",
                "lines_between_start_to_end": ["X"],
                "success_message": "Success",
                "fail_message": "Failure"
            }]}"#,
        )
        .unwrap();
        path
    }

    fn request(log_dir: &Path, scenario_file: PathBuf, output_dir: &Path) -> RunRequest {
        RunRequest {
            log_dir: log_dir.to_path_buf(),
            scenario_file,
            output_dir: output_dir.to_path_buf(),
            coordinator: CoordinatorConfig {
                workers: 2,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_output_file_name_format() {
        let name = output_file_name();
        assert!(name.starts_with("output_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "output_2024-01-01_00-00-00.csv".len());
    }

    #[test]
    fn test_successful_run_emits_single_terminal_event() {
        let work = tempfile::tempdir().unwrap();
        let logs = work.path().join("logs");
        fs::create_dir(&logs).unwrap();
        fs::write(logs.join("a.log"), "A start\nmid X\nB end\n").unwrap();
        let scenario_file = write_scenarios(work.path());

        let mut events = Vec::new();
        let outcome = run_analysis(
            &request(&logs, scenario_file, work.path()),
            &CancelToken::new(),
            |e| events.push(e),
        );

        let RunOutcome::Success(output) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.last().unwrap().is_terminal());
        assert!(matches!(events[0], RunProgress::Started));

        let text = fs::read_to_string(&output).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].ends_with(",1,A start,2,mid X,3,B end,Success"), "got {}", rows[1]);
    }

    #[test]
    fn test_config_failure_creates_no_output() {
        let work = tempfile::tempdir().unwrap();
        let logs = work.path().join("logs");
        fs::create_dir(&logs).unwrap();
        fs::write(logs.join("a.log"), "start\nend\n").unwrap();
        let scenario_file = work.path().join("scenario.json");
        fs::write(&scenario_file, r#"{"scenarios": []}"#).unwrap();
        let out = work.path().join("out");
        fs::create_dir(&out).unwrap();

        let outcome = run_analysis(
            &request(&logs, scenario_file, &out),
            &CancelToken::new(),
            |_| {},
        );
        assert!(matches!(outcome, RunOutcome::Failed(ref m) if m.contains("No scenarios")));
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_no_files_found_creates_no_output() {
        let work = tempfile::tempdir().unwrap();
        let logs = work.path().join("logs");
        fs::create_dir(&logs).unwrap();
        let scenario_file = write_scenarios(work.path());
        let out = work.path().join("out");
        fs::create_dir(&out).unwrap();

        let outcome = run_analysis(
            &request(&logs, scenario_file, &out),
            &CancelToken::new(),
            |_| {},
        );
        assert!(
            matches!(outcome, RunOutcome::Failed(ref m) if m.contains("No log files found")),
            "got {outcome:?}"
        );
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_cancelled_run_reports_cancelled_with_wellformed_output() {
        let work = tempfile::tempdir().unwrap();
        let logs = work.path().join("logs");
        fs::create_dir(&logs).unwrap();
        fs::write(logs.join("a.log"), "start\nX\nend\n").unwrap();
        let scenario_file = write_scenarios(work.path());

        let cancel = CancelToken::new();
        let mut events = Vec::new();
        let outcome = run_analysis(
            &request(&logs, scenario_file, work.path()),
            &cancel,
            |e| {
                if matches!(e, RunProgress::FilesDiscovered { .. }) {
                    cancel.cancel();
                }
                events.push(e);
            },
        );

        assert_eq!(outcome, RunOutcome::Cancelled);
        let Some(RunProgress::Cancelled { output, summary }) = events.last() else {
            panic!("expected Cancelled as last event");
        };
        assert_eq!(summary.units_completed, 0);
        let text = fs::read_to_string(output).unwrap();
        assert_eq!(text.lines().count(), 1, "header only");
    }

    #[test]
    fn test_run_manager_relays_events() {
        let work = tempfile::tempdir().unwrap();
        let logs = work.path().join("logs");
        fs::create_dir(&logs).unwrap();
        fs::write(logs.join("a.log"), "start\nX\nend\n").unwrap();
        let scenario_file = write_scenarios(work.path());

        let mut manager = RunManager::new();
        manager.start_run(request(&logs, scenario_file, work.path()));

        let mut terminal = None;
        for _ in 0..500 {
            if let Some(event) = manager.wait_progress(Duration::from_millis(20)) {
                if event.is_terminal() {
                    terminal = Some(event);
                    break;
                }
            }
        }
        assert!(
            matches!(terminal, Some(RunProgress::Completed { ref summary, .. }) if summary.rows_written == 1),
            "got {terminal:?}"
        );
        assert!(manager.poll_progress().is_empty());
    }
}
