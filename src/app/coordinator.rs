// ScenarioSleuth - app/coordinator.rs
//
// Fans (file x scenario) units of work out onto a fixed-size worker pool.
//
// Architecture:
//   - `plan` validates the scenario set and discovers files. It touches no
//     output, so fatal errors surface before the artifact exists.
//   - `execute` submits units to a rayon pool through a bounded window
//     (workers * SUBMIT_WINDOW_FACTOR in flight). Cancellation therefore
//     stops submission immediately; in-flight units observe the token once
//     per line and wind down on their own.
//   - Workers report completion over an mpsc channel; only this thread
//     updates progress, through the atomic counters in `RunState`.
//
// Rule 11 compliance:
//   - Per-file failures are non-fatal: counted, logged, and surfaced as
//     warnings (capped at MAX_WARNINGS), never propagated to sibling units.

use crate::app::sink::RecordSender;
use crate::core::discovery::{self, DiscoveryConfig};
use crate::core::matcher::{self, ScanOutcome};
use crate::core::model::CancelToken;
use crate::core::scenario::Scenario;
use crate::util::constants;
use crate::util::error::{ConfigError, SleuthError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

// =============================================================================
// Configuration and shared state
// =============================================================================

/// Settings for one coordinator run.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Worker threads; 0 means available parallelism.
    pub workers: usize,
    pub discovery: DiscoveryConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workers: constants::DEFAULT_WORKER_THREADS,
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Progress counters for a run.
///
/// Written only by the coordinator thread; readable from anywhere. The
/// cancel flag is the one piece of state other parties may set.
#[derive(Debug, Default)]
pub struct RunState {
    total_units: AtomicUsize,
    completed_units: AtomicUsize,
    failed_units: AtomicUsize,
    records_emitted: AtomicUsize,
    cancel: CancelToken,
}

impl RunState {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }

    pub fn total_units(&self) -> usize {
        self.total_units.load(Ordering::SeqCst)
    }

    pub fn completed_units(&self) -> usize {
        self.completed_units.load(Ordering::SeqCst)
    }

    /// Units whose file could not be opened or read.
    pub fn failed_units(&self) -> usize {
        self.failed_units.load(Ordering::SeqCst)
    }

    pub fn records_emitted(&self) -> usize {
        self.records_emitted.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

/// Files and scenarios resolved for a run, ready to execute.
#[derive(Debug)]
pub struct ScanPlan {
    pub files: Vec<PathBuf>,
    pub scenarios: Vec<Arc<Scenario>>,
    /// Non-fatal discovery warnings.
    pub warnings: Vec<String>,
}

impl ScanPlan {
    pub fn total_units(&self) -> usize {
        self.files.len() * self.scenarios.len()
    }
}

/// What `execute` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorReport {
    pub files: usize,
    pub units_total: usize,
    pub units_completed: usize,
    pub units_failed: usize,
    pub records_emitted: usize,
    pub cancelled: bool,
    /// Per-file failure messages, capped at MAX_WARNINGS.
    pub warnings: Vec<String>,
}

/// Completion notice sent by a worker.
struct UnitDone {
    file: PathBuf,
    scenario: String,
    outcome: ScanOutcome,
}

// =============================================================================
// Planning
// =============================================================================

/// Validate the scenario set and discover files under `directory`.
///
/// Fails with `ConfigError::EmptyScenarioSet` or `DiscoveryError::NoFilesFound`
/// (among other discovery errors) before anything is scanned.
pub fn plan(
    directory: &Path,
    scenarios: Vec<Arc<Scenario>>,
    config: &CoordinatorConfig,
    cancel: &CancelToken,
) -> Result<ScanPlan, SleuthError> {
    if scenarios.is_empty() {
        return Err(ConfigError::EmptyScenarioSet.into());
    }

    let discovery_config = DiscoveryConfig {
        cancel: Some(cancel.clone()),
        ..config.discovery.clone()
    };

    let (files, warnings) = discovery::discover_files(directory, &discovery_config, |path, count| {
        tracing::trace!(file = %path.display(), count, "File discovered");
    })?;

    tracing::info!(
        directory = %directory.display(),
        files = files.len(),
        scenarios = scenarios.len(),
        "Scan planned"
    );

    Ok(ScanPlan {
        files,
        scenarios,
        warnings,
    })
}

// =============================================================================
// Execution
// =============================================================================

/// Resolve a configured worker count: 0 means available parallelism.
pub fn resolve_workers(configured: usize) -> usize {
    let workers = if configured == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(constants::FALLBACK_WORKER_THREADS)
    } else {
        configured
    };
    workers.clamp(1, constants::ABSOLUTE_MAX_WORKER_THREADS)
}

/// Run every (file, scenario) unit of `plan`, forwarding records to `sender`.
///
/// `on_progress(completed, total)` is called on this thread after each unit
/// finishes, whether it completed, was cancelled, or failed.
pub fn execute<P>(
    plan: &ScanPlan,
    workers: usize,
    sender: &RecordSender,
    state: &RunState,
    mut on_progress: P,
) -> Result<CoordinatorReport, SleuthError>
where
    P: FnMut(usize, usize),
{
    let workers = resolve_workers(workers);
    let total = plan.total_units();
    state.total_units.store(total, Ordering::SeqCst);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("scan-worker-{i}"))
        .build()
        .map_err(|source| SleuthError::WorkerPool { workers, source })?;

    tracing::info!(workers, units = total, "Scan started");

    let window = workers * constants::SUBMIT_WINDOW_FACTOR;
    let (done_tx, done_rx) = mpsc::channel::<UnitDone>();
    let mut units = plan
        .files
        .iter()
        .flat_map(|file| plan.scenarios.iter().map(move |scenario| (file, scenario)));

    let mut in_flight = 0usize;
    let mut exhausted = false;
    let mut warnings: Vec<String> = Vec::new();

    loop {
        while !exhausted && in_flight < window && !state.is_cancelled() {
            let Some((file, scenario)) = units.next() else {
                exhausted = true;
                break;
            };

            let file = file.clone();
            let scenario = Arc::clone(scenario);
            let sender = sender.clone();
            let cancel = state.cancel.clone();
            let done_tx = done_tx.clone();

            pool.spawn(move || {
                let outcome = matcher::scan_file(
                    &file,
                    &scenario,
                    |record| {
                        // A closed sink means the run is winding down.
                        let _ = sender.send(record);
                    },
                    || cancel.is_cancelled(),
                );
                let _ = done_tx.send(UnitDone {
                    file,
                    scenario: scenario.name.clone(),
                    outcome,
                });
            });
            in_flight += 1;
        }

        if in_flight == 0 {
            break;
        }

        let Ok(done) = done_rx.recv() else {
            break;
        };
        in_flight -= 1;

        state
            .records_emitted
            .fetch_add(done.outcome.records(), Ordering::SeqCst);

        if let ScanOutcome::Failed { error, .. } = &done.outcome {
            state.failed_units.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(
                file = %done.file.display(),
                scenario = %done.scenario,
                error = %error,
                "Unit failed; file contributes no further records"
            );
            if warnings.len() < constants::MAX_WARNINGS {
                warnings.push(format!("Scenario '{}': {error}", done.scenario));
            }
        } else {
            tracing::trace!(
                file = %done.file.display(),
                scenario = %done.scenario,
                outcome = ?done.outcome,
                "Unit finished"
            );
        }

        let completed = state.completed_units.fetch_add(1, Ordering::SeqCst) + 1;
        on_progress(completed, total);
    }

    let report = CoordinatorReport {
        files: plan.files.len(),
        units_total: total,
        units_completed: state.completed_units(),
        units_failed: state.failed_units(),
        records_emitted: state.records_emitted(),
        cancelled: state.is_cancelled(),
        warnings,
    };

    tracing::info!(
        completed = report.units_completed,
        total = report.units_total,
        failed = report.units_failed,
        records = report.records_emitted,
        cancelled = report.cancelled,
        "Scan finished"
    );

    Ok(report)
}

/// Plan and execute in one call. Returns the number of files considered.
pub fn run<P>(
    directory: &Path,
    scenarios: Vec<Arc<Scenario>>,
    config: &CoordinatorConfig,
    sender: &RecordSender,
    state: &RunState,
    on_progress: P,
) -> Result<usize, SleuthError>
where
    P: FnMut(usize, usize),
{
    let plan = plan(directory, scenarios, config, state.cancel_token())?;
    let report = execute(&plan, config.workers, sender, state, on_progress)?;
    Ok(report.files)
}
