//! Core types shared by the checkers: issues, severities, metrics.

use serde::{Deserialize, Serialize};

/// Severity levels for issues.
///
/// `Critical` and `Error` block a change; `Warning` never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
}

impl Severity {
    /// Whether an issue of this severity blocks the change.
    pub fn blocks(&self) -> bool {
        matches!(self, Severity::Critical | Severity::Error)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Which checker produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Complexity,
    Security,
    Semantic,
    Test,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Complexity => "complexity",
            IssueKind::Security => "security",
            IssueKind::Semantic => "semantic",
            IssueKind::Test => "test",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Security rule categories, used for the per-category counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCategory {
    Injection,
    Xss,
    Crypto,
    Auth,
    DataExposure,
}

impl SecurityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityCategory::Injection => "injection",
            SecurityCategory::Xss => "xss",
            SecurityCategory::Crypto => "crypto",
            SecurityCategory::Auth => "auth",
            SecurityCategory::DataExposure => "data_exposure",
        }
    }
}

/// 1-based source position of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A single detected issue.
///
/// Issues are append-only within one analysis pass and never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub location: Location,
    pub rule_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Security issue counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.error + self.warning
    }
}

/// Security issue counts by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub injection: usize,
    pub xss: usize,
    pub crypto: usize,
    pub auth: usize,
    pub data_exposure: usize,
}

impl CategoryCounts {
    pub fn record(&mut self, category: SecurityCategory) {
        match category {
            SecurityCategory::Injection => self.injection += 1,
            SecurityCategory::Xss => self.xss += 1,
            SecurityCategory::Crypto => self.crypto += 1,
            SecurityCategory::Auth => self.auth += 1,
            SecurityCategory::DataExposure => self.data_exposure += 1,
        }
    }
}

/// Aggregate metrics for one analysis pass.
///
/// Fields only ever increase while the checkers run: maxima take the
/// larger value on merge, counts add.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub function_count: usize,
    pub max_cyclomatic_complexity: u32,
    pub max_cognitive_complexity: u32,
    pub max_nesting_depth: u32,
    pub max_parameter_count: u32,
    pub max_function_length: u32,
    /// Functions whose cyclomatic complexity exceeds the threshold.
    pub functions_over_complexity: usize,
    pub security_by_severity: SeverityCounts,
    pub security_by_category: CategoryCounts,
    pub naming_violations: usize,
    pub type_violations: usize,
}

impl Metrics {
    /// Merge another metrics snapshot into this one.
    pub fn merge(&mut self, other: &Metrics) {
        self.function_count += other.function_count;
        self.max_cyclomatic_complexity = self
            .max_cyclomatic_complexity
            .max(other.max_cyclomatic_complexity);
        self.max_cognitive_complexity = self
            .max_cognitive_complexity
            .max(other.max_cognitive_complexity);
        self.max_nesting_depth = self.max_nesting_depth.max(other.max_nesting_depth);
        self.max_parameter_count = self.max_parameter_count.max(other.max_parameter_count);
        self.max_function_length = self.max_function_length.max(other.max_function_length);
        self.functions_over_complexity += other.functions_over_complexity;
        self.security_by_severity.critical += other.security_by_severity.critical;
        self.security_by_severity.error += other.security_by_severity.error;
        self.security_by_severity.warning += other.security_by_severity.warning;
        self.security_by_category.injection += other.security_by_category.injection;
        self.security_by_category.xss += other.security_by_category.xss;
        self.security_by_category.crypto += other.security_by_category.crypto;
        self.security_by_category.auth += other.security_by_category.auth;
        self.security_by_category.data_exposure += other.security_by_category.data_exposure;
        self.naming_violations += other.naming_violations;
        self.type_violations += other.type_violations;
    }
}

/// Shared sink the checkers feed: issues in discovery order plus
/// aggregate metrics.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub issues: Vec<Issue>,
    pub metrics: Metrics,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Merge a checker's result into this context.
    ///
    /// Issue order is preserved: the merged issues land after everything
    /// already present, so the final list reflects checker run order.
    pub fn merge(&mut self, other: AnalysisContext) {
        self.issues.extend(other.issues);
        self.metrics.merge(&other.metrics);
    }

    /// Check if any issue blocks the change.
    pub fn has_blocking_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity.blocks())
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn count_by_kind(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}
