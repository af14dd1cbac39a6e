// ScenarioSleuth - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation (DevWorkflow Part A Rule 2).
// All errors preserve the causal chain for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all ScenarioSleuth operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum SleuthError {
    /// Scenario configuration loading or validation failed.
    Config(ConfigError),

    /// File discovery failed.
    Discovery(DiscoveryError),

    /// Writing the output artifact failed.
    Export(ExportError),

    /// Application config.toml loading failed.
    AppConfig(AppConfigError),

    /// The scan worker pool could not be created.
    WorkerPool {
        workers: usize,
        source: rayon::ThreadPoolBuildError,
    },

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for SleuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Scenario config error: {e}"),
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::AppConfig(e) => write!(f, "Configuration error: {e}"),
            Self::WorkerPool { workers, source } => {
                write!(f, "Cannot start {workers} scan workers: {source}")
            }
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for SleuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::AppConfig(e) => Some(e),
            Self::WorkerPool { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario config errors
// ---------------------------------------------------------------------------

/// Errors related to loading and compiling the scenario configuration.
///
/// All variants are fatal: the run aborts before any scanning begins.
#[derive(Debug)]
pub enum ConfigError {
    /// The scenario file could not be read.
    Io { path: PathBuf, source: io::Error },

    /// The scenario file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// JSON could not be parsed, or a required field is missing.
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The document contains no scenarios.
    NoScenarios { path: PathBuf },

    /// A run was started with an empty scenario set.
    EmptyScenarioSet,

    /// Two scenarios share the same name.
    DuplicateScenario { name: String },

    /// `mandatory_logic` is neither "OR" nor "AND".
    InvalidMandatoryLogic { scenario: String, value: String },

    /// A regex pattern in the scenario is invalid.
    InvalidRegex {
        scenario: String,
        field: &'static str,
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(
                    f,
                    "Cannot read scenario file '{}': {source}",
                    path.display()
                )
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Scenario file '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::JsonParse { path, source } => {
                write!(f, "Failed to parse JSON '{}': {source}", path.display())
            }
            Self::NoScenarios { path } => {
                write!(f, "No scenarios found in config file '{}'", path.display())
            }
            Self::EmptyScenarioSet => write!(f, "No scenarios configured for this run"),
            Self::DuplicateScenario { name } => {
                write!(f, "Duplicate scenario name '{name}'")
            }
            Self::InvalidMandatoryLogic { scenario, value } => write!(
                f,
                "Scenario '{scenario}': mandatory_logic = \"{value}\" is not recognised. \
                 Expected \"OR\" or \"AND\""
            ),
            Self::InvalidRegex {
                scenario,
                field,
                pattern,
                source,
            } => write!(
                f,
                "Scenario '{scenario}': invalid regex in '{field}' ('{pattern}'): {source}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::JsonParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for SleuthError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to file discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The root scan path does not exist or is not accessible.
    RootNotFound { path: PathBuf },

    /// The root path is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the root path.
    PermissionDenied { path: PathBuf, source: io::Error },

    /// Traversal finished without finding a single log file.
    NoFilesFound { path: PathBuf },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Log directory '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Log directory '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(
                    f,
                    "Permission denied accessing '{}': {source}",
                    path.display()
                )
            }
            Self::NoFilesFound { path } => {
                write!(
                    f,
                    "No log files found in the specified directory '{}'",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for SleuthError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Per-file scan errors
// ---------------------------------------------------------------------------

/// Errors raised while scanning one file for one scenario.
///
/// These never abort a run: the matcher converts them into a failed
/// outcome and the coordinator counts them.
#[derive(Debug)]
pub enum ScanError {
    /// The file could not be opened.
    Open { file: PathBuf, source: io::Error },

    /// Reading failed part-way through the file.
    Read {
        file: PathBuf,
        line_number: u64,
        source: io::Error,
    },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { file, source } => {
                write!(f, "'{}': cannot open: {source}", file.display())
            }
            Self::Read {
                file,
                line_number,
                source,
            } => write!(
                f,
                "'{}': read failed after line {line_number}: {source}",
                file.display()
            ),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Read { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to writing the output artifact.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error creating or flushing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// The writer thread panicked before reporting.
    WriterPanicked { path: PathBuf },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::WriterPanicked { path } => {
                write!(f, "Result writer for '{}' terminated abnormally", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::WriterPanicked { .. } => None,
        }
    }
}

impl From<ExportError> for SleuthError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Application config errors
// ---------------------------------------------------------------------------

/// Errors related to config.toml loading.
#[derive(Debug)]
pub enum AppConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for AppConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for AppConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<AppConfigError> for SleuthError {
    fn from(e: AppConfigError) -> Self {
        Self::AppConfig(e)
    }
}

/// Convenience type alias for ScenarioSleuth results.
pub type Result<T> = std::result::Result<T, SleuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_no_files_found_message_names_directory() {
        let err = DiscoveryError::NoFilesFound {
            path: PathBuf::from("/var/log/app"),
        };
        let msg = err.to_string();
        assert!(msg.contains("No log files found"), "got: {msg}");
        assert!(msg.contains("/var/log/app"), "got: {msg}");
    }

    #[test]
    fn test_top_level_error_preserves_source_chain() {
        let inner = ScanError::Open {
            file: PathBuf::from("a.log"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(inner.source().is_some());

        let wrapped: SleuthError = ConfigError::DuplicateScenario {
            name: "login".to_string(),
        }
        .into();
        assert!(wrapped.to_string().contains("Duplicate scenario name 'login'"));
        assert!(wrapped.source().is_some());
    }
}
