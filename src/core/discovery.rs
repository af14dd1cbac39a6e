// ScenarioSleuth - core/discovery.rs
//
// Recursive directory traversal and log file discovery.
//
// Architecture note: this module uses `walkdir` for directory traversal as an
// OS abstraction (similar to using std::path::Path). It reads only directory
// entries, never file *contents* -- that boundary is owned by the matcher.
//
// Rule 11 compliance:
//   - Per-entry I/O errors are non-fatal and collected as warnings.
//   - Recursion is unbounded by default. A configured max_depth that stops
//     descent into a directory is reported as a warning.
//   - Exclude patterns short-circuit directory descent via filter_entry so
//     excluded subtrees are never traversed at all.

use crate::core::model::CancelToken;
use crate::util::error::DiscoveryError;
use std::path::{Path, PathBuf};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a discovery operation.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum directory recursion depth. `None` walks the whole tree.
    pub max_depth: Option<usize>,

    /// Glob patterns (filename-only) that a file MUST match to be included.
    /// An empty list means "include everything that is not excluded".
    pub include_patterns: Vec<String>,

    /// Glob patterns matched against filenames AND directory component names.
    /// Matching files are skipped; matching directories are not descended into.
    pub exclude_patterns: Vec<String>,

    /// Optional cancel token, checked on every walker iteration. When set,
    /// discovery stops early and returns the partial list without raising
    /// `NoFilesFound`.
    pub cancel: Option<CancelToken>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        use crate::util::constants;
        Self {
            max_depth: None,
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            exclude_patterns: constants::DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            cancel: None,
        }
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Discover log files under `root`, applying include/exclude glob patterns.
///
/// Returned paths are sorted so that scheduling order is deterministic.
///
/// # Progress reporting
/// `on_file_found` is called once per accepted file, receiving the file path
/// and the running count of files accepted so far.
///
/// # Non-fatal errors
/// Files/directories that cannot be accessed are recorded as human-readable
/// strings in the returned warnings vector.
///
/// # Fatal errors
/// `RootNotFound`, `NotADirectory`, `PermissionDenied` for a bad root, and
/// `NoFilesFound` when a complete walk accepted nothing.
pub fn discover_files<F>(
    root: &Path,
    config: &DiscoveryConfig,
    mut on_file_found: F,
) -> Result<(Vec<PathBuf>, Vec<String>), DiscoveryError>
where
    F: FnMut(&Path, usize),
{
    // Pre-flight: fs::metadata distinguishes access-denied from not-found,
    // which Path::is_dir() does not.
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(DiscoveryError::NotADirectory {
                path: root.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DiscoveryError::PermissionDenied {
                path: root.to_path_buf(),
                source: e,
            })
        }
        Err(_) => {
            return Err(DiscoveryError::RootNotFound {
                path: root.to_path_buf(),
            })
        }
    }

    let max_depth = config.max_depth;

    tracing::debug!(
        root = %root.display(),
        max_depth = ?max_depth,
        include = ?config.include_patterns,
        exclude = ?config.exclude_patterns,
        "Discovery starting"
    );

    let include_pats = compile_patterns(&config.include_patterns, "include");
    let exclude_pats = compile_patterns(&config.exclude_patterns, "exclude");

    let mut files: Vec<PathBuf> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut cancelled = false;

    let mut walk = walkdir::WalkDir::new(root).follow_links(false);
    if let Some(depth) = max_depth {
        walk = walk.max_depth(depth);
    }

    let walker = walk
        .into_iter()
        .filter_entry(|e| {
            if e.file_type().is_dir() {
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_str().unwrap_or("");
                return !is_excluded_component(name, &exclude_pats);
            }
            true
        });

    for entry_result in walker {
        if config.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            tracing::debug!("Discovery cancelled by request");
            cancelled = true;
            break;
        }

        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if max_depth == Some(entry.depth()) && entry.depth() > 0 {
                let msg = format!(
                    "Directory '{}' is at max_depth {}; its contents were not scanned",
                    entry.path().display(),
                    entry.depth()
                );
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
            }
            continue;
        }

        let path = entry.path();

        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => {
                warnings.push(format!("Skipping '{}': non-UTF-8 filename", path.display()));
                continue;
            }
        };

        if is_excluded_filename(file_name, &exclude_pats) {
            tracing::trace!(file = file_name, "Excluded by pattern");
            continue;
        }

        if !is_included(file_name, &include_pats) {
            tracing::trace!(file = file_name, "Not matched by include patterns");
            continue;
        }

        files.push(path.to_path_buf());
        on_file_found(path, files.len());
    }

    if files.is_empty() && !cancelled {
        return Err(DiscoveryError::NoFilesFound {
            path: root.to_path_buf(),
        });
    }

    files.sort();

    tracing::debug!(
        files = files.len(),
        warnings = warnings.len(),
        cancelled,
        "Discovery complete"
    );

    Ok((files, warnings))
}

// =============================================================================
// Glob helpers
// =============================================================================

/// Compile a list of glob pattern strings into `glob::Pattern` objects.
/// Patterns that fail to compile are logged as warnings and skipped.
fn compile_patterns(patterns: &[String], kind: &str) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, kind, error = %e, "Invalid glob pattern, skipping");
                None
            }
        })
        .collect()
}

/// Returns true if `dir_name` matches any exclude pattern that contains no
/// wildcard characters. These are treated as directory component exclusions
/// (e.g. "archive", ".git") rather than filename glob patterns.
fn is_excluded_component(dir_name: &str, exclude_pats: &[glob::Pattern]) -> bool {
    exclude_pats.iter().any(|p| {
        let s = p.as_str();
        !s.contains('*') && !s.contains('?') && !s.contains('[') && p.matches(dir_name)
    })
}

/// Returns true if `file_name` matches any exclude pattern (wildcard or literal).
fn is_excluded_filename(file_name: &str, exclude_pats: &[glob::Pattern]) -> bool {
    exclude_pats.iter().any(|p| p.matches(file_name))
}

/// Returns true if `file_name` matches at least one include pattern.
/// An empty include list means "include all" (returns true).
fn is_included(file_name: &str, include_pats: &[glob::Pattern]) -> bool {
    if include_pats.is_empty() {
        return true;
    }
    include_pats.iter().any(|p| p.matches(file_name))
}

// =============================================================================
// Tests
// =============================================================================
