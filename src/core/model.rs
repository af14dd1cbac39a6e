// ScenarioSleuth - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no UI,
// no platform dependencies.
//
// These types are the shared vocabulary across all layers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Mandatory logic
// =============================================================================

/// How the mandatory patterns of a scenario decide success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MandatoryLogic {
    /// Success if at least one mandatory pattern matched inside the window.
    #[default]
    Or,
    /// Success iff every mandatory pattern matched at least once.
    And,
}

impl MandatoryLogic {
    /// Parse the config spelling (case-insensitive "OR" / "AND").
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OR" => Some(Self::Or),
            "AND" => Some(Self::And),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Or => "OR",
            Self::And => "AND",
        }
    }
}

impl std::fmt::Display for MandatoryLogic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Match record (output unit)
// =============================================================================

/// One detected scenario window, ready to be written as an output row.
///
/// Immutable after the matcher creates it; ownership passes to the result
/// sink through the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Path of the log file the window was found in.
    pub file_path: PathBuf,

    /// Name of the scenario that produced the window.
    pub scenario_name: String,

    /// 1-based line number of the start match.
    pub first_line_no: u64,

    /// Trimmed text of the start line.
    pub first_line_text: String,

    /// Line numbers of mandatory matches, ascending.
    pub mandatory_line_nos: Vec<u64>,

    /// Trimmed texts of mandatory matches, in first-observed order.
    pub mandatory_line_texts: Vec<String>,

    /// 1-based line number of the end match.
    pub second_line_no: u64,

    /// Trimmed text of the end line.
    pub second_line_text: String,

    /// The scenario's success or fail message.
    pub outcome_message: String,
}

// =============================================================================
// Cancellation
// =============================================================================

/// Shared, monotonic cancellation signal.
///
/// Cloning is cheap and every clone observes the same flag. Once cancelled
/// the token stays cancelled. Cancellation is
/// advisory: workers poll it once per line and the sink once per dequeue, so
/// wind-down is prompt but not instantaneous.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Never blocks.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Run progress and outcome
// =============================================================================

/// Summary statistics for a completed (or cancelled) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Log files considered.
    pub files: usize,
    /// Scenarios applied to every file.
    pub scenarios: usize,
    /// `files * scenarios`.
    pub units_total: usize,
    /// Units that finished (including cancelled and failed units).
    pub units_completed: usize,
    /// Units whose file could not be opened or read.
    pub units_failed: usize,
    /// Records produced by the matchers.
    pub records_emitted: usize,
    /// Rows actually written to the output artifact.
    pub rows_written: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Progress messages sent from a background run to the presentation layer.
#[derive(Debug, Clone)]
pub enum RunProgress {
    /// The run has started.
    Started,

    /// Scenario definitions were loaded and compiled.
    ScenariosLoaded { count: usize },

    /// File discovery finished.
    FilesDiscovered { files: usize, total_units: usize },

    /// One (file, scenario) unit finished.
    UnitCompleted { completed: usize, total: usize },

    /// A non-fatal warning occurred during the run.
    Warning { message: String },

    /// Run finished normally; the artifact is closed.
    Completed { output: PathBuf, summary: RunSummary },

    /// Run was cancelled; the artifact holds the rows written so far.
    Cancelled { output: PathBuf, summary: RunSummary },

    /// Run failed with a fatal error.
    Failed { error: String },
}

impl RunProgress {
    /// True for the three terminal messages.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled { .. } | Self::Failed { .. }
        )
    }
}

/// Terminal outcome of one analysis run, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Completed normally; output written to the path.
    Success(PathBuf),
    /// Completed after cancellation.
    Cancelled,
    /// Failed with a reason.
    Failed(String),
}
