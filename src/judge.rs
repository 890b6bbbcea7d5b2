//! Decision engine: folds analyzer output into allow/deny/ask.
//!
//! The engine is stateless across files; one call walks the full
//! pipeline (parse, extract, check, decide) and terminates. Retry
//! memory lives in [`crate::retry`], owned by the gate.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::analysis::{self, SyntaxModel};
use crate::check::{self, AnalysisContext, Issue, IssueKind, Location, Metrics, Severity};
use crate::config::Config;
use crate::testrun::TestOutcome;

/// The gate's answer for one proposed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
    /// Reserved for unparseable input and internal errors; normal rule
    /// evaluation never produces it.
    Ask,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow => write!(f, "allow"),
            Decision::Deny => write!(f, "deny"),
            Decision::Ask => write!(f, "ask"),
        }
    }
}

/// Full evaluation result for one proposed change.
///
/// `message` is filled by the feedback layer: a correction prompt on
/// deny, a short confirmation on allow, an explanation on ask.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub decision: Decision,
    /// Diagnostic signal in [0, 1]; never part of the decision.
    pub confidence: f64,
    pub issues: Vec<Issue>,
    pub metrics: Metrics,
    pub message: String,
}

/// Rule id attached to the synthetic blocking-tests issue.
pub const FAILING_TESTS_RULE: &str = "failing_tests";

/// Evaluate one proposed file content.
///
/// Analyzer order is fixed (complexity, security, semantic) so the
/// issue list, and therefore the rendered feedback, is deterministic.
/// A failing analyzer is dropped with a diagnostic; the others still
/// run.
pub fn evaluate(
    file_path: &str,
    content: &str,
    config: &Config,
    test_outcome: Option<&TestOutcome>,
) -> Verdict {
    let model = match SyntaxModel::parse(file_path, content) {
        Ok(model) => model,
        Err(e) => {
            warn!("parse failure for {}: {}", file_path, e);
            return Verdict {
                decision: Decision::Ask,
                confidence: confidence(&[]),
                issues: Vec::new(),
                metrics: Metrics::default(),
                message: format!("cannot analyze {}: {}", file_path, e),
            };
        }
    };

    let functions = analysis::extract(&model);
    let mut ctx = AnalysisContext::new();

    merge_checker(
        &mut ctx,
        "complexity",
        check::complexity::check(file_path, &functions, &config.complexity),
    );
    merge_checker(&mut ctx, "security", check::security::scan(&model, &config.security));
    merge_checker(&mut ctx, "semantic", check::semantic::check(&model, &config.semantic));

    let tests_failed = test_outcome.map(|t| t.has_failures()).unwrap_or(false);
    if tests_failed && config.tests_are_blocking {
        let failed = test_outcome.map(|t| t.failed.max(1)).unwrap_or(1);
        ctx.push_issue(Issue {
            kind: IssueKind::Test,
            severity: Severity::Error,
            location: Location {
                file: file_path.to_string(),
                line: 1,
                column: 1,
            },
            rule_id: FAILING_TESTS_RULE.to_string(),
            message: format!("{} test(s) failing", failed),
            suggestion: Some("Fix the failing tests before resubmitting".to_string()),
            snippet: None,
        });
    }

    let decision = decide(&ctx, tests_failed && config.tests_are_blocking);
    Verdict {
        decision,
        confidence: confidence(&ctx.issues),
        issues: ctx.issues,
        metrics: ctx.metrics,
        message: String::new(),
    }
}

/// Fold one checker's result into the shared context.
///
/// A failed checker loses its findings but never blocks the others.
fn merge_checker(
    ctx: &mut AnalysisContext,
    name: &str,
    result: anyhow::Result<AnalysisContext>,
) {
    match result {
        Ok(partial) => ctx.merge(partial),
        Err(e) => warn!("{} checker failed, dropping its findings: {}", name, e),
    }
}

/// Decision precedence over an issue set.
///
/// Critical denies, then error, then blocking test failures; warnings
/// never block.
fn decide(ctx: &AnalysisContext, blocking_test_failures: bool) -> Decision {
    if ctx.count_by_severity(Severity::Critical) > 0 {
        return Decision::Deny;
    }
    if ctx.count_by_severity(Severity::Error) > 0 {
        return Decision::Deny;
    }
    if blocking_test_failures {
        return Decision::Deny;
    }
    Decision::Allow
}

/// Confidence starts at 1.0 and drops 0.30 per critical, 0.20 per
/// error, 0.05 per warning, clamped to [0, 1].
pub fn confidence(issues: &[Issue]) -> f64 {
    let penalty: f64 = issues
        .iter()
        .map(|i| match i.severity {
            Severity::Critical => 0.30,
            Severity::Error => 0.20,
            Severity::Warning => 0.05,
        })
        .sum();
    (1.0 - penalty).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity) -> Issue {
        Issue {
            kind: IssueKind::Complexity,
            severity,
            location: Location {
                file: "a.ts".to_string(),
                line: 1,
                column: 1,
            },
            rule_id: "cyclomatic_complexity".to_string(),
            message: "m".to_string(),
            suggestion: None,
            snippet: None,
        }
    }

    #[test]
    fn test_clean_change_is_allowed() {
        let verdict = evaluate(
            "a.ts",
            "function add(a: number, b: number) { return a + b; }",
            &Config::default(),
            None,
        );
        assert_eq!(verdict.decision, Decision::Allow);
        assert!(verdict.issues.is_empty());
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn test_critical_issue_denies() {
        let verdict = evaluate(
            "a.ts",
            "db.query(`SELECT * FROM t WHERE id = ${id}`);",
            &Config::default(),
            None,
        );
        assert_eq!(verdict.decision, Decision::Deny);
        let criticals: Vec<_> = verdict
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .collect();
        assert_eq!(criticals.len(), 1);
        assert_eq!(criticals[0].rule_id, "sql_injection");
    }

    #[test]
    fn test_warnings_never_block() {
        // Deep nesting is a warning under default severities.
        let verdict = evaluate(
            "a.ts",
            "function f(x){ if(x>0){ if(x>10){ if(x>20){ if(x>30){ if(x>40){ return x; } } } } } return 0; }",
            &Config::default(),
            None,
        );
        assert_eq!(verdict.decision, Decision::Allow);
        assert!(verdict
            .issues
            .iter()
            .any(|i| i.rule_id == check::complexity::rules::NESTING));
        assert!(verdict.confidence < 1.0);
    }

    #[test]
    fn test_flattened_version_is_clean() {
        let verdict = evaluate(
            "a.ts",
            "function f(x){ if(x<=0) return 0; if(x<=10) return 0; if(x<=20) return 0; return x; }",
            &Config::default(),
            None,
        );
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.metrics.max_nesting_depth, 1);
        assert!(verdict.issues.is_empty());
    }

    #[test]
    fn test_blocking_test_failures_deny() {
        let outcome = TestOutcome {
            total: 3,
            passed: 1,
            failed: 2,
            failures: Vec::new(),
            duration_ms: None,
        };
        let verdict = evaluate(
            "a.ts",
            "function ok() { return 1; }",
            &Config::default(),
            Some(&outcome),
        );
        assert_eq!(verdict.decision, Decision::Deny);
        assert!(verdict
            .issues
            .iter()
            .any(|i| i.rule_id == FAILING_TESTS_RULE && i.kind == IssueKind::Test));
    }

    #[test]
    fn test_nonblocking_test_failures_allow() {
        let mut config = Config::default();
        config.tests_are_blocking = false;
        let outcome = TestOutcome {
            total: 3,
            passed: 1,
            failed: 2,
            failures: Vec::new(),
            duration_ms: None,
        };
        let verdict = evaluate("a.ts", "function ok() { return 1; }", &config, Some(&outcome));
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[test]
    fn test_confidence_penalties_and_clamp() {
        assert_eq!(confidence(&[]), 1.0);
        let one_each = [
            issue(Severity::Critical),
            issue(Severity::Error),
            issue(Severity::Warning),
        ];
        let c = confidence(&one_each);
        assert!((c - 0.45).abs() < 1e-9);

        let many: Vec<_> = (0..10).map(|_| issue(Severity::Critical)).collect();
        assert_eq!(confidence(&many), 0.0);
    }

    #[test]
    fn test_decide_precedence() {
        let mut ctx = AnalysisContext::new();
        assert_eq!(decide(&ctx, false), Decision::Allow);
        assert_eq!(decide(&ctx, true), Decision::Deny);
        ctx.push_issue(issue(Severity::Warning));
        assert_eq!(decide(&ctx, false), Decision::Allow);
        ctx.push_issue(issue(Severity::Error));
        assert_eq!(decide(&ctx, false), Decision::Deny);
    }
}
