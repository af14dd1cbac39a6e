// ScenarioSleuth - core/scenario.rs
//
// Scenario definition parsing, validation, and compilation.
// Core layer: accepts JSON strings, never touches the filesystem.
// I/O is handled by app::scenario_loader which feeds content here.

use crate::core::model::MandatoryLogic;
use crate::util::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// JSON deserialization structures (raw input)
// =============================================================================

/// Raw scenario document as deserialized from the JSON config file.
#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub scenarios: Vec<ScenarioDef>,
}

/// One raw scenario object. Required keys have no serde default, so a
/// missing key fails deserialization with the field name in the message.
#[derive(Debug, Deserialize)]
pub struct ScenarioDef {
    pub name: String,
    pub start_pattern: String,
    pub end_pattern: String,
    pub lines_between_start_to_end: Vec<String>,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default = "default_mandatory_logic")]
    pub mandatory_logic: String,
    #[serde(default = "default_include_fails")]
    pub include_fails: bool,
    pub success_message: String,
    pub fail_message: String,
}

fn default_mandatory_logic() -> String {
    MandatoryLogic::Or.label().to_string()
}

fn default_include_fails() -> bool {
    true
}

// =============================================================================
// Compiled runtime types
// =============================================================================

/// A single line matcher, decided once at load time.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Plain substring containment.
    Substring(String),
    /// Compiled regular expression, searched anywhere in the line.
    Regex(Regex),
}

impl Pattern {
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Self::Substring(needle) => line.contains(needle.as_str()),
            Self::Regex(re) => re.is_match(line),
        }
    }

    /// The source text of the pattern (for logging).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Substring(s) => s,
            Self::Regex(re) => re.as_str(),
        }
    }
}

/// An immutable, compiled scenario shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub start: Pattern,
    pub end: Pattern,
    /// Mandatory patterns in declaration order.
    pub mandatory: Vec<Pattern>,
    pub use_regex: bool,
    pub logic: MandatoryLogic,
    pub include_fails: bool,
    pub success_message: String,
    pub fail_message: String,
}

impl Scenario {
    /// Build a scenario from already-validated parts. Used by tests and by
    /// callers that construct scenarios programmatically.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        start: Pattern,
        end: Pattern,
        mandatory: Vec<Pattern>,
        logic: MandatoryLogic,
        include_fails: bool,
        success_message: &str,
        fail_message: &str,
    ) -> Self {
        let use_regex = matches!(start, Pattern::Regex(_));
        Self {
            name: name.to_string(),
            start,
            end,
            mandatory,
            use_regex,
            logic,
            include_fails,
            success_message: success_message.to_string(),
            fail_message: fail_message.to_string(),
        }
    }
}

// =============================================================================
// Parsing and compilation
// =============================================================================

/// Parse a JSON string into a `ScenarioFile`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_scenario_json(content: &str, source_path: &Path) -> Result<ScenarioFile, ConfigError> {
    serde_json::from_str(content).map_err(|e| ConfigError::JsonParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Validate every definition and compile it into a shareable `Scenario`.
///
/// Fails on the first problem found: an empty list, a duplicate name,
/// an unknown mandatory logic, or a bad regex.
pub fn compile_scenarios(
    file: ScenarioFile,
    source_path: &Path,
) -> Result<Vec<Arc<Scenario>>, ConfigError> {
    if file.scenarios.is_empty() {
        return Err(ConfigError::NoScenarios {
            path: source_path.to_path_buf(),
        });
    }

    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(file.scenarios.len());

    for def in file.scenarios {
        if !seen.insert(def.name.clone()) {
            return Err(ConfigError::DuplicateScenario { name: def.name });
        }
        let scenario = compile_scenario(def)?;
        tracing::debug!(
            scenario = %scenario.name,
            start = scenario.start.as_str(),
            end = scenario.end.as_str(),
            use_regex = scenario.use_regex,
            logic = %scenario.logic,
            mandatory = scenario.mandatory.len(),
            include_fails = scenario.include_fails,
            "Scenario compiled"
        );
        compiled.push(Arc::new(scenario));
    }

    Ok(compiled)
}

/// Validate and compile one scenario definition.
///
/// Empty strings are accepted: an empty pattern matches every line, so an
/// empty `end_pattern` closes each window on its start line.
pub fn compile_scenario(def: ScenarioDef) -> Result<Scenario, ConfigError> {
    for (field, value) in [
        ("name", &def.name),
        ("start_pattern", &def.start_pattern),
        ("end_pattern", &def.end_pattern),
    ] {
        if value.is_empty() {
            tracing::warn!(
                scenario = %def.name,
                field,
                "Scenario field is empty and will match every line"
            );
        }
    }

    let logic = MandatoryLogic::parse(&def.mandatory_logic).ok_or_else(|| {
        ConfigError::InvalidMandatoryLogic {
            scenario: def.name.clone(),
            value: def.mandatory_logic.clone(),
        }
    })?;

    let build = |field: &'static str, source: &str| -> Result<Pattern, ConfigError> {
        if def.use_regex {
            compile_regex(&def.name, field, source).map(Pattern::Regex)
        } else {
            Ok(Pattern::Substring(source.to_string()))
        }
    };

    let start = build("start_pattern", &def.start_pattern)?;
    let end = build("end_pattern", &def.end_pattern)?;
    let mandatory = def
        .lines_between_start_to_end
        .iter()
        .map(|p| build("lines_between_start_to_end", p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Scenario {
        name: def.name,
        start,
        end,
        mandatory,
        use_regex: def.use_regex,
        logic,
        include_fails: def.include_fails,
        success_message: def.success_message,
        fail_message: def.fail_message,
    })
}

fn compile_regex(scenario: &str, field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
        scenario: scenario.to_string(),
        field,
        pattern: pattern.to_string(),
        source: e,
    })
}
