// ScenarioSleuth - app/scenario_loader.rs
//
// Loads the scenario configuration file from disk and hands its content to
// core::scenario for parsing and compilation. Every failure here is fatal
// for the run and happens before any scanning begins.

use crate::core::scenario::{self, Scenario};
use crate::util::constants;
use crate::util::error::ConfigError;
use std::path::Path;
use std::sync::Arc;

/// Read, parse, and compile the scenario file at `path`.
///
/// Regexes are compiled here, once per scenario; the returned `Arc`s are
/// shared read-only by every worker.
pub fn load_scenarios(path: &Path) -> Result<Vec<Arc<Scenario>>, ConfigError> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if metadata.len() > constants::MAX_SCENARIO_FILE_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: constants::MAX_SCENARIO_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let file = scenario::parse_scenario_json(&content, path)?;
    let scenarios = scenario::compile_scenarios(file, path)?;

    tracing::info!(
        path = %path.display(),
        scenarios = scenarios.len(),
        "Scenario config loaded"
    );

    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        fs::write(
            &path,
            r#"{"scenarios": [
                {"name": "a", "start_pattern": "s", "end_pattern": "e",
                 "lines_between_start_to_end": ["m"],
                 "success_message": "ok", "fail_message": "no"},
                {"name": "b", "start_pattern": "s", "end_pattern": "e",
                 "lines_between_start_to_end": [], "mandatory_logic": "AND",
                 "success_message": "ok", "fail_message": "no"}
            ]}"#,
        )
        .unwrap();

        let scenarios = load_scenarios(&path).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].name, "a");
        assert_eq!(scenarios[1].name, "b");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_scenarios(Path::new("/nonexistent/scenario.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_scenarios(&path).unwrap_err();
        assert!(matches!(err, ConfigError::JsonParse { .. }));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.json");
        let size = constants::MAX_SCENARIO_FILE_SIZE as usize + 1;
        fs::write(&path, vec![b' '; size]).unwrap();
        let err = load_scenarios(&path).unwrap_err();
        assert!(matches!(err, ConfigError::FileTooLarge { .. }));
    }
}
