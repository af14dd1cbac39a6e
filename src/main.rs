// ScenarioSleuth - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Starting the analysis run on a background thread
// 4. Progress feed on stdout and stdin-driven cancellation
//
// Exit codes: 0 success, 2 cancelled, 1 failure.

use clap::Parser;
use scenariosleuth::app::controller::{self, RunManager, RunRequest};
use scenariosleuth::app::coordinator::CoordinatorConfig;
use scenariosleuth::core::discovery::DiscoveryConfig;
use scenariosleuth::core::model::{CancelToken, RunProgress, RunSummary};
use scenariosleuth::platform::config::{self, PlatformPaths};
use scenariosleuth::util;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

/// ScenarioSleuth - find start/end scenarios in log files.
///
/// Scans every log file under a directory for the scenarios defined in a
/// JSON config and writes one CSV row per matched window.
/// Type `q` or `stop` and press Enter to cancel a running scan.
#[derive(Parser, Debug)]
#[command(name = "ScenarioSleuth", version, about)]
struct Cli {
    /// Directory to scan recursively for log files.
    log_dir: PathBuf,

    /// Scenario configuration file.
    #[arg(short = 'c', long = "config", default_value = util::constants::DEFAULT_SCENARIO_FILE)]
    scenario_config: PathBuf,

    /// Directory the CSV report is written to (default: config.toml, then current directory).
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Worker threads (0 = number of CPUs).
    #[arg(short = 'w', long = "workers")]
    workers: Option<usize>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Application config.toml (default: platform config directory).
    #[arg(long = "app-config")]
    app_config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // config.toml is read first because it may set the log level.
    let config_path = cli
        .app_config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file());
    let (app_config, config_warnings) = config::load_config(&config_path);

    util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "ScenarioSleuth starting"
    );
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| app_config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    if let Err(e) = controller::validate_output_dir(&output_dir) {
        tracing::error!(error = %e, "Output directory unusable");
        eprintln!("Error: {e}");
        return ExitCode::from(1);
    }

    let request = RunRequest {
        log_dir: cli.log_dir.clone(),
        scenario_file: cli.scenario_config.clone(),
        output_dir,
        coordinator: CoordinatorConfig {
            workers: cli.workers.unwrap_or(app_config.workers),
            discovery: DiscoveryConfig {
                max_depth: app_config.max_depth,
                include_patterns: app_config.include_patterns.clone(),
                exclude_patterns: app_config.exclude_patterns.clone(),
                cancel: None,
            },
        },
    };

    let mut manager = RunManager::new();
    manager.start_run(request);

    if let Some(cancel) = manager.cancel_token() {
        spawn_stdin_watcher(cancel);
    }

    let Some(progress_rx) = manager.progress_rx.as_ref() else {
        return ExitCode::from(1);
    };
    loop {
        match progress_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event) => {
                if let Some(code) = report(&event) {
                    return code;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::error!("Analysis thread ended without a final status");
                eprintln!("Error: analysis stopped unexpectedly");
                return ExitCode::from(1);
            }
        }
    }
}

/// Cancel the run when the user types `q` or `stop`.
///
/// The thread is detached; it blocks on stdin for the process lifetime.
fn spawn_stdin_watcher(cancel: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("stdin-cancel".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let command = line.trim().to_lowercase();
                if command == "q" || command == "stop" {
                    tracing::info!("Cancellation requested from stdin");
                    println!("Stopping...");
                    cancel.cancel();
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Could not watch stdin; cancellation unavailable");
    }
}

/// Print one progress event. Returns the exit code for terminal events.
fn report(event: &RunProgress) -> Option<ExitCode> {
    match event {
        RunProgress::Started => {
            println!("Starting analysis (type 'q' or 'stop' and press Enter to cancel)");
        }
        RunProgress::ScenariosLoaded { count } => println!("Loaded {count} scenario(s)"),
        RunProgress::FilesDiscovered { files, total_units } => {
            println!("Found {files} log file(s), {total_units} scan unit(s)");
        }
        RunProgress::UnitCompleted { completed, total } => {
            tracing::debug!(completed, total, "Progress");
            if *completed == *total || *completed % 100 == 0 {
                println!("Progress: {completed}/{total}");
            }
        }
        RunProgress::Warning { message } => eprintln!("Warning: {message}"),
        RunProgress::Completed { output, summary } => {
            print_summary(summary);
            println!("Results written to {}", output.display());
            return Some(ExitCode::SUCCESS);
        }
        RunProgress::Cancelled { output, summary } => {
            print_summary(summary);
            println!("Analysis stopped; partial results in {}", output.display());
            return Some(ExitCode::from(2));
        }
        RunProgress::Failed { error } => {
            eprintln!("Error: {error}");
            return Some(ExitCode::from(1));
        }
    }
    None
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Scanned {}/{} unit(s) across {} file(s) and {} scenario(s) in {:.2}s; {} row(s) written",
        summary.units_completed,
        summary.units_total,
        summary.files,
        summary.scenarios,
        summary.duration.as_secs_f64(),
        summary.rows_written,
    );
    if summary.units_failed > 0 {
        println!("{} unit(s) could not be read", summary.units_failed);
    }
}
