//! Test-runner boundary types.
//!
//! The gate never shells out to a test framework itself; the runner
//! lives outside the core and its parsed summary is injected here as a
//! plain value.

use serde::{Deserialize, Serialize};

/// Parsed summary of an external test run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    #[serde(default)]
    pub failures: Vec<TestFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// A single failing test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFailure {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestOutcome {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || !self.failures.is_empty()
    }

    /// Outcome representing a runner that exceeded its timeout.
    ///
    /// A hung runner is reported as a single synthetic failure rather
    /// than propagating the hang to the gate.
    pub fn timed_out(timeout_ms: u64) -> Self {
        Self {
            total: 1,
            passed: 0,
            failed: 1,
            failures: vec![TestFailure {
                name: "test-runner".to_string(),
                message: Some(format!("test runner timed out after {}ms", timeout_ms)),
            }],
            duration_ms: Some(timeout_ms),
        }
    }

    /// Parse an outcome from a JSON summary file.
    pub fn parse_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let outcome: TestOutcome = serde_json::from_str(&content)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_is_single_failure() {
        let outcome = TestOutcome::timed_out(30_000);
        assert!(outcome.has_failures());
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0]
            .message
            .as_deref()
            .unwrap()
            .contains("30000ms"));
    }

    #[test]
    fn test_json_round_trip() {
        let outcome = TestOutcome {
            total: 10,
            passed: 8,
            failed: 2,
            failures: vec![TestFailure {
                name: "auth works".to_string(),
                message: Some("expected 200, got 401".to_string()),
            }],
            duration_ms: None,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        let back: TestOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
