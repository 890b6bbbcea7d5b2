//! Output formatting for verdicts.
//!
//! Two formats: pretty (colored terminal output) and JSON (structured,
//! for hook/CI consumption). The correction message itself is rendered
//! by [`crate::feedback`]; this module only frames it for the CLI.

use colored::*;
use serde::Serialize;

use crate::check::{Issue, Metrics, Severity};
use crate::judge::{Decision, Verdict};

/// JSON report envelope.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: String,
    pub path: String,
    pub decision: Decision,
    pub confidence: f64,
    pub issues: &'a [Issue],
    pub metrics: &'a Metrics,
    pub message: &'a str,
}

impl<'a> JsonReport<'a> {
    pub fn new(path: &str, verdict: &'a Verdict) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            path: path.to_string(),
            decision: verdict.decision,
            confidence: verdict.confidence,
            issues: &verdict.issues,
            metrics: &verdict.metrics,
            message: &verdict.message,
        }
    }
}

/// Write a verdict as JSON to stdout.
pub fn write_json(path: &str, verdict: &Verdict) -> anyhow::Result<()> {
    let report = JsonReport::new(path, verdict);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

/// Write a verdict as colored terminal output.
pub fn write_pretty(path: &str, verdict: &Verdict) {
    println!("{} {}", "changegate".bold(), path);

    for issue in &verdict.issues {
        println!(
            "  {} {} [{}] {}",
            severity_tag(issue.severity),
            issue.location,
            issue.rule_id,
            issue.message
        );
        if let Some(suggestion) = &issue.suggestion {
            println!("        {} {}", "fix:".dimmed(), suggestion);
        }
    }

    if !verdict.issues.is_empty() {
        println!();
    }

    println!(
        "{} (confidence {:.2})",
        decision_tag(verdict.decision),
        verdict.confidence
    );

    if !verdict.message.is_empty() {
        println!();
        println!("{}", verdict.message);
    }
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "critical".red().bold(),
        Severity::Error => "error".red(),
        Severity::Warning => "warning".yellow(),
    }
}

fn decision_tag(decision: Decision) -> ColoredString {
    match decision {
        Decision::Allow => "ALLOW".green().bold(),
        Decision::Deny => "DENY".red().bold(),
        Decision::Ask => "ASK".yellow().bold(),
    }
}
