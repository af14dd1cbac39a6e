// ScenarioSleuth - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Referenced by DevWorkflow Part A Rule 11 (explicit named-constant limits).

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "ScenarioSleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "ScenarioSleuth";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Discovery limits
// =============================================================================

// Directory recursion is unbounded unless `[scan] max_depth` is set.
// Symlinks are not followed, so the walk always terminates.

/// Default include glob patterns for log file discovery.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*.log"];

/// Default exclude glob patterns for log file discovery.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[];

// =============================================================================
// Scenario configuration limits
// =============================================================================

/// Default scenario configuration file name (resolved against the CWD).
pub const DEFAULT_SCENARIO_FILE: &str = "scenario.json";

/// Maximum size of a scenario configuration file in bytes.
pub const MAX_SCENARIO_FILE_SIZE: u64 = 1024 * 1024; // 1 MiB

// =============================================================================
// Scanning
// =============================================================================

/// Buffer capacity used when reading log files line by line.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024; // 64 KB

/// Default number of worker threads for the scan pool.
/// 0 means auto-detect (use available CPU cores).
pub const DEFAULT_WORKER_THREADS: usize = 0;

/// Hard upper bound on worker threads (prevents configuration mistakes).
pub const ABSOLUTE_MAX_WORKER_THREADS: usize = 256;

/// Fallback worker count when available parallelism cannot be queried.
pub const FALLBACK_WORKER_THREADS: usize = 4;

/// In-flight units allowed per worker before the coordinator stops
/// submitting and waits for a completion.
pub const SUBMIT_WINDOW_FACTOR: usize = 2;

/// How long the result sink waits on an empty queue before re-checking the
/// cancel token (ms).
pub const SINK_POLL_INTERVAL_MS: u64 = 100;

/// Rows written between explicit flushes of the output artifact.
pub const SINK_FLUSH_EVERY_ROWS: usize = 256;

/// Maximum number of non-fatal warnings accumulated across a single run.
pub const MAX_WARNINGS: usize = 1_000;

// =============================================================================
// Output
// =============================================================================

/// `chrono` format string for the timestamped output artifact name.
pub const OUTPUT_FILE_NAME_FORMAT: &str = "output_%Y-%m-%d_%H-%M-%S.csv";

/// Header row of the output artifact.
pub const OUTPUT_HEADER: [&str; 9] = [
    "FilePath",
    "Scenario",
    "FirstLineNo",
    "FirstLine",
    "MandatoryPatternLineNos",
    "MandatoryPatternLines",
    "SecondLineNo",
    "SecondLine",
    "Result",
];

/// Separator between mandatory line numbers in the output.
pub const LINE_NO_SEPARATOR: &str = ", ";

/// Separator between mandatory line texts in the output.
pub const LINE_TEXT_SEPARATOR: &str = "; ";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
/// Prevents accidental exposure of sensitive data in long lines.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
