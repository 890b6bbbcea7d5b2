//! Gate configuration.
//!
//! A config is a closed set of typed fields: unknown keys are ignored
//! at the YAML boundary and never reach the checkers as untyped data.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::check::Severity;

/// Top-level gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub complexity: ComplexityThresholds,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub semantic: SemanticConfig,
    /// Denials allowed per session before the gate fails open.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Whether failing tests block a change.
    #[serde(default = "default_true")]
    pub tests_are_blocking: bool,
    /// Glob patterns for paths the gate never validates.
    #[serde(default)]
    pub excluded_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            complexity: ComplexityThresholds::default(),
            security: SecurityConfig::default(),
            semantic: SemanticConfig::default(),
            max_retries: default_max_retries(),
            tests_are_blocking: true,
            excluded_paths: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Check if a path is excluded from validation.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();
        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                if glob.compile_matcher().is_match(&*path_str) {
                    return true;
                }
            }
        }
        false
    }
}

/// Per-metric complexity thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComplexityThresholds {
    #[serde(default = "default_cyclomatic")]
    pub max_cyclomatic_complexity: u32,
    #[serde(default = "default_cognitive")]
    pub max_cognitive_complexity: u32,
    #[serde(default = "default_nesting")]
    pub max_nesting_depth: u32,
    #[serde(default = "default_parameters")]
    pub max_parameter_count: u32,
    #[serde(default = "default_function_lines")]
    pub max_function_lines: u32,
    /// Per-rule severity overrides, e.g. escalating `nesting_depth`
    /// overruns from warning to error.
    #[serde(default)]
    pub severity_overrides: HashMap<String, Severity>,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            max_cyclomatic_complexity: default_cyclomatic(),
            max_cognitive_complexity: default_cognitive(),
            max_nesting_depth: default_nesting(),
            max_parameter_count: default_parameters(),
            max_function_lines: default_function_lines(),
            severity_overrides: HashMap::new(),
        }
    }
}

impl ComplexityThresholds {
    /// Severity for a complexity rule: the override if present, the
    /// rule's built-in default otherwise.
    pub fn severity_for(&self, rule_id: &str, default: Severity) -> Severity {
        self.severity_overrides
            .get(rule_id)
            .copied()
            .unwrap_or(default)
    }
}

/// Security scanner configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Rule ids to run. `None` runs the full default table.
    #[serde(default)]
    pub enabled_rules: Option<Vec<String>>,
    /// Per-rule severity overrides. `warning` overrides are coerced to
    /// `error`; see the scanner.
    #[serde(default)]
    pub severity_overrides: HashMap<String, Severity>,
}

impl SecurityConfig {
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        match &self.enabled_rules {
            None => true,
            Some(enabled) => enabled.iter().any(|id| id == rule_id),
        }
    }
}

/// Semantic checker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SemanticConfig {
    #[serde(default = "default_semantic_checks")]
    pub enabled_checks: Vec<String>,
    #[serde(default = "severity_default_warning")]
    pub naming_severity: Severity,
    #[serde(default = "severity_default_warning")]
    pub any_type_severity: Severity,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled_checks: default_semantic_checks(),
            naming_severity: Severity::Warning,
            any_type_severity: Severity::Warning,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_cyclomatic() -> u32 {
    10
}

fn default_cognitive() -> u32 {
    15
}

fn default_nesting() -> u32 {
    4
}

fn default_parameters() -> u32 {
    5
}

fn default_function_lines() -> u32 {
    50
}

fn severity_default_warning() -> Severity {
    Severity::Warning
}

fn default_semantic_checks() -> Vec<String> {
    vec![
        crate::check::semantic::checks::NAMING.to_string(),
        crate::check::semantic::checks::TYPE_CONSISTENCY.to_string(),
    ]
}

/// Validate a config for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    let t = &config.complexity;
    for (name, value) in [
        ("max_cyclomatic_complexity", t.max_cyclomatic_complexity),
        ("max_cognitive_complexity", t.max_cognitive_complexity),
        ("max_nesting_depth", t.max_nesting_depth),
        ("max_parameter_count", t.max_parameter_count),
        ("max_function_lines", t.max_function_lines),
    ] {
        if value == 0 {
            anyhow::bail!("{} must be at least 1", name);
        }
    }

    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}
