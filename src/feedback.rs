//! Correction-message rendering.
//!
//! The denial message is the gate's interface to whoever (or whatever)
//! wrote the change, so it is deterministic: given the same issue set,
//! test outcome, and attempt counter, the output is byte-identical.
//! Issues render in discovery order, never re-sorted.

use crate::check::{Issue, IssueKind, Severity};
use crate::testrun::TestOutcome;

/// Blocking issues shown in full.
const MAX_BLOCKING_SHOWN: usize = 5;
/// Warnings shown when nothing blocks.
const MAX_WARNINGS_SHOWN: usize = 3;
/// Failing tests listed by name.
const MAX_TESTS_SHOWN: usize = 5;

/// Render the correction prompt for a denied change.
pub fn denial_message(
    issues: &[Issue],
    test_outcome: Option<&TestOutcome>,
    attempt: u32,
    max_retries: u32,
    confidence: f64,
) -> String {
    let mut out = String::new();
    out.push_str("Change denied by quality gate.\n");

    push_summary(&mut out, issues);

    let blocking: Vec<&Issue> = issues.iter().filter(|i| i.severity.blocks()).collect();
    if !blocking.is_empty() {
        out.push_str("\nFix these first:\n");
        for (idx, issue) in blocking.iter().take(MAX_BLOCKING_SHOWN).enumerate() {
            push_issue_lines(&mut out, idx + 1, issue);
        }
        if blocking.len() > MAX_BLOCKING_SHOWN {
            out.push_str(&format!(
                "  ... and {} more\n",
                blocking.len() - MAX_BLOCKING_SHOWN
            ));
        }
    } else {
        let warnings: Vec<&Issue> = issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .collect();
        if !warnings.is_empty() {
            out.push_str("\nAdvisories:\n");
            for (idx, issue) in warnings.iter().take(MAX_WARNINGS_SHOWN).enumerate() {
                push_issue_lines(&mut out, idx + 1, issue);
            }
            if warnings.len() > MAX_WARNINGS_SHOWN {
                out.push_str(&format!(
                    "  ... and {} more\n",
                    warnings.len() - MAX_WARNINGS_SHOWN
                ));
            }
        }
    }

    if let Some(outcome) = test_outcome {
        if outcome.has_failures() {
            out.push_str("\nFailing tests:\n");
            for failure in outcome.failures.iter().take(MAX_TESTS_SHOWN) {
                match &failure.message {
                    Some(msg) => out.push_str(&format!("  - {}: {}\n", failure.name, msg)),
                    None => out.push_str(&format!("  - {}\n", failure.name)),
                }
            }
            let unnamed = outcome.failed.saturating_sub(outcome.failures.len());
            if outcome.failures.len() > MAX_TESTS_SHOWN {
                out.push_str(&format!(
                    "  ... and {} more\n",
                    outcome.failures.len() - MAX_TESTS_SHOWN
                ));
            } else if unnamed > 0 {
                out.push_str(&format!("  ... and {} unnamed failure(s)\n", unnamed));
            }
        }
    }

    out.push_str(&format!(
        "\nAttempt {} of {}. Confidence: {:.2}.\n",
        attempt, max_retries, confidence
    ));

    if attempt >= 2 {
        out.push_str(&format!(
            "This change has been denied {} times; consider a different approach.\n",
            attempt
        ));
    }
    if attempt >= max_retries {
        out.push_str("Retry limit reached: the next submission will not be blocked.\n");
    }

    out
}

/// Short confirmation for an allowed change.
pub fn allow_message(issues: &[Issue]) -> String {
    let warnings = issues
        .iter()
        .filter(|i| i.severity == Severity::Warning)
        .count();
    if warnings > 0 {
        format!("Change allowed with {} advisory warning(s).", warnings)
    } else {
        "Change allowed.".to_string()
    }
}

/// Warning rendered when the gate fails open after too many retries.
pub fn fail_open_message(max_retries: u32) -> String {
    format!(
        "Change allowed despite blocking issues: the retry limit ({}) was reached. \
         Review the last correction prompt before shipping.",
        max_retries
    )
}

/// One summary line per issue category, fixed category order.
fn push_summary(out: &mut String, issues: &[Issue]) {
    const KIND_ORDER: [IssueKind; 4] = [
        IssueKind::Complexity,
        IssueKind::Security,
        IssueKind::Semantic,
        IssueKind::Test,
    ];

    if issues.is_empty() {
        return;
    }

    out.push_str("\nSummary:\n");
    for kind in KIND_ORDER {
        let count = issues.iter().filter(|i| i.kind == kind).count();
        if count > 0 {
            out.push_str(&format!("  {}: {} issue(s)\n", kind, count));
        }
    }
}

fn push_issue_lines(out: &mut String, number: usize, issue: &Issue) {
    out.push_str(&format!(
        "  {}. {} [{}] {}\n",
        number, issue.location, issue.rule_id, issue.message
    ));
    if let Some(suggestion) = &issue.suggestion {
        out.push_str(&format!("     fix: {}\n", suggestion));
    }
}
