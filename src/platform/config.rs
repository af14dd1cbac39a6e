// ScenarioSleuth - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation (DevWorkflow Part A Rule 13).
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::AppConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for ScenarioSleuth configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/scenariosleuth/ or %APPDATA%\ScenarioSleuth\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation (Rule 13)
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so an older binary accepts a newer file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[scan]` section.
    pub scan: ScanSection,
    /// `[output]` section.
    pub output: OutputSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[scan]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Number of worker threads (0 = auto).
    pub workers: Option<usize>,
    /// Maximum directory recursion depth.
    pub max_depth: Option<usize>,
    /// Include glob patterns.
    pub include_patterns: Option<Vec<String>>,
    /// Exclude glob patterns.
    pub exclude_patterns: Option<Vec<String>>,
}

/// `[output]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Directory the CSV artifact is written to.
    pub directory: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Scan --
    pub workers: usize,
    /// None walks the whole tree.
    pub max_depth: Option<usize>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,

    // -- Output --
    /// None means the current working directory.
    pub output_dir: Option<PathBuf>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workers: constants::DEFAULT_WORKER_THREADS,
            max_depth: None,
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_patterns: constants::DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: None,
            log_level: None,
        }
    }
}

/// Load and validate the config.toml at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file yields defaults with no warnings (first run). An unreadable
/// or unparseable file yields defaults plus a warning; the run still starts.
///
/// Called before logging is initialised (the level comes from this file),
/// so findings are returned rather than logged.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        return (AppConfig::default(), warnings);
    }

    let parsed = std::fs::read_to_string(config_path)
        .map_err(|e| AppConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })
        .and_then(|content| parse_config(&content, config_path));

    match parsed {
        Ok((config, field_warnings)) => {
            warnings.extend(field_warnings);
            (config, warnings)
        }
        Err(e) => {
            warnings.push(format!("{e}. Using defaults."));
            (AppConfig::default(), warnings)
        }
    }
}

/// Parse and validate config.toml content, accumulating all field warnings.
pub fn parse_config(
    content: &str,
    path: &Path,
) -> Result<(AppConfig, Vec<String>), AppConfigError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| AppConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut warnings = Vec::new();
    let mut config = AppConfig::default();

    // -- Scan: workers --
    if let Some(workers) = raw.scan.workers {
        if workers <= constants::ABSOLUTE_MAX_WORKER_THREADS {
            config.workers = workers;
        } else {
            warnings.push(format!(
                "[scan] workers = {workers} is out of range (0-{}). Using default (auto).",
                constants::ABSOLUTE_MAX_WORKER_THREADS,
            ));
        }
    }

    // -- Scan: max_depth --
    if let Some(depth) = raw.scan.max_depth {
        if depth >= 1 {
            config.max_depth = Some(depth);
        } else {
            warnings.push(format!(
                "[scan] max_depth = {depth} would skip every file. Using default (unlimited).",
            ));
        }
    }

    // -- Scan: patterns --
    if let Some(patterns) = raw.scan.include_patterns {
        if patterns.is_empty() {
            warnings.push(
                "[scan] include_patterns is empty; no file could match. Using default (*.log)."
                    .to_string(),
            );
        } else {
            config.include_patterns = patterns;
        }
    }
    if let Some(patterns) = raw.scan.exclude_patterns {
        config.exclude_patterns = patterns;
    }

    // -- Output: directory --
    if let Some(dir) = raw.output.directory {
        if !dir.trim().is_empty() {
            config.output_dir = Some(PathBuf::from(dir));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    Ok((config, warnings))
}
