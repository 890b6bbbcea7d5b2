//! Security scanner: regex rules over the raw source text.
//!
//! The scanner deliberately works on text, not the tree: the rules are
//! cheap, explainable, and tolerant of partially valid input. Match
//! positions are tracked explicitly so line/column mapping stays exact.
//!
//! Severity handling carries a known quirk from the original rule set:
//! a security rule configured down to `warning` is coerced back to
//! `error`. Security findings are never reported below error severity;
//! only `critical` overrides are honored as-is.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::SyntaxModel;
use crate::config::SecurityConfig;

use super::{AnalysisContext, Issue, IssueKind, Location, SecurityCategory, Severity};

/// Bytes of context included around a match in the issue snippet.
const SNIPPET_CONTEXT: usize = 50;

/// A single security rule: pattern plus reporting metadata.
pub struct SecurityRule {
    pub id: &'static str,
    pub severity: Severity,
    pub category: SecurityCategory,
    pub pattern: &'static str,
    /// A match is skipped when its enclosing line also matches this.
    pub exempt: Option<&'static str>,
    pub message: &'static str,
    pub fix: &'static str,
}

/// The default rule table.
pub static DEFAULT_RULES: &[SecurityRule] = &[
    SecurityRule {
        id: "sql_injection",
        severity: Severity::Critical,
        category: SecurityCategory::Injection,
        pattern: r#"(?i)\b(?:query|execute|exec)\s*\(\s*(?:`\s*(?:select|insert|update|delete|create|drop|alter)\b[^`]*\$\{|['"]\s*(?:select|insert|update|delete|create|drop|alter)\b[^'"]*['"]\s*\+)"#,
        exempt: None,
        message: "SQL query built from interpolated or concatenated input",
        fix: "Use parameterized queries with placeholder values",
    },
    SecurityRule {
        id: "raw_html_injection",
        severity: Severity::Error,
        category: SecurityCategory::Xss,
        pattern: r#"\.(?:innerHTML|outerHTML)\s*\+?=\s*(?:[A-Za-z_$][\w$]*|`[^`]*\$\{)"#,
        exempt: None,
        message: "HTML sink assigned from a non-literal source",
        fix: "Use textContent, or sanitize the value before inserting markup",
    },
    SecurityRule {
        id: "dangerous_html_prop",
        severity: Severity::Error,
        category: SecurityCategory::Xss,
        pattern: r#"dangerouslySetInnerHTML\s*=\s*\{"#,
        exempt: None,
        message: "dangerouslySetInnerHTML bypasses React's escaping",
        fix: "Render the content as text, or sanitize it first",
    },
    SecurityRule {
        id: "dynamic_code_eval",
        severity: Severity::Error,
        category: SecurityCategory::Injection,
        pattern: r#"\beval\s*\(|\bnew\s+Function\s*\("#,
        exempt: None,
        message: "dynamic code evaluation",
        fix: "Replace eval/new Function with a static dispatch table",
    },
    SecurityRule {
        id: "weak_hash",
        severity: Severity::Error,
        category: SecurityCategory::Crypto,
        pattern: r#"(?i)createHash\s*\(\s*['"](?:md5|sha1)['"]"#,
        exempt: None,
        message: "broken hash primitive",
        fix: "Use sha256 or stronger",
    },
    SecurityRule {
        id: "weak_cipher",
        severity: Severity::Error,
        category: SecurityCategory::Crypto,
        pattern: r#"(?i)createCipheriv?\s*\(\s*['"](?:des|des-ede3|rc2|rc4|bf)[^'"]*['"]"#,
        exempt: None,
        message: "deprecated cipher primitive",
        fix: "Use aes-256-gcm",
    },
    SecurityRule {
        id: "hardcoded_credential",
        severity: Severity::Error,
        category: SecurityCategory::Auth,
        pattern: r#"(?i)\b[\w$]*(?:password|passwd|secret|token|api[_-]?key|credential|private[_-]?key)[\w$]*\s*[:=]\s*['"][^'"]{8,}['"]"#,
        exempt: Some(r"process\.env"),
        message: "credential-shaped name assigned a string literal",
        fix: "Read the value from the environment or a secret store",
    },
    SecurityRule {
        id: "sensitive_logging",
        severity: Severity::Error,
        category: SecurityCategory::DataExposure,
        pattern: r#"(?i)console\.(?:log|info|warn|debug)\s*\([^)\n]*\b(?:password|passwd|secret|token|api[_-]?key)"#,
        exempt: None,
        message: "sensitive value written to the console",
        fix: "Drop the field from the log call or redact it",
    },
];

struct CompiledRule {
    rule: &'static SecurityRule,
    regex: Regex,
    exempt: Option<Regex>,
}

static COMPILED_RULES: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    DEFAULT_RULES
        .iter()
        .map(|rule| CompiledRule {
            rule,
            // The table is static; a non-compiling pattern is a
            // programming error caught by the unit tests below.
            regex: Regex::new(rule.pattern).expect("invalid security rule pattern"),
            exempt: rule.exempt.map(|p| Regex::new(p).expect("invalid exempt pattern")),
        })
        .collect()
});

/// Look up a default rule by id.
pub fn rule_by_id(id: &str) -> Option<&'static SecurityRule> {
    DEFAULT_RULES.iter().find(|r| r.id == id)
}

/// Scan the model's raw source for every enabled rule.
///
/// Every non-overlapping match of every enabled rule emits one issue at
/// the match's mapped position with a snippet of surrounding text.
pub fn scan(model: &SyntaxModel, config: &SecurityConfig) -> anyhow::Result<AnalysisContext> {
    let mut ctx = AnalysisContext::new();
    let source = model.source();

    if let Some(enabled) = &config.enabled_rules {
        for id in enabled {
            if rule_by_id(id).is_none() {
                warn!("unknown security rule id {:?}, skipping", id);
            }
        }
    }

    for compiled in COMPILED_RULES.iter() {
        let rule = compiled.rule;
        if !config.is_rule_enabled(rule.id) {
            continue;
        }

        let severity = effective_severity(rule, config);

        for m in compiled.regex.find_iter(source) {
            if let Some(exempt) = &compiled.exempt {
                if exempt.is_match(enclosing_line(source, m.start())) {
                    continue;
                }
            }

            let (line, column) = model.position_at(m.start());
            ctx.metrics.security_by_severity.record(severity);
            ctx.metrics.security_by_category.record(rule.category);
            ctx.push_issue(Issue {
                kind: IssueKind::Security,
                severity,
                location: Location {
                    file: model.path().to_string(),
                    line,
                    column,
                },
                rule_id: rule.id.to_string(),
                message: rule.message.to_string(),
                suggestion: Some(rule.fix.to_string()),
                snippet: Some(
                    model
                        .snippet_around(m.start(), m.end(), SNIPPET_CONTEXT)
                        .to_string(),
                ),
            });
        }
    }

    Ok(ctx)
}

/// Resolve a rule's severity against the config overrides.
///
/// `critical` overrides are honored; anything else is pinned at error.
fn effective_severity(rule: &SecurityRule, config: &SecurityConfig) -> Severity {
    let configured = config
        .severity_overrides
        .get(rule.id)
        .copied()
        .unwrap_or(rule.severity);
    match configured {
        Severity::Critical => Severity::Critical,
        Severity::Error => Severity::Error,
        Severity::Warning => {
            debug!(
                "security rule {:?} configured as warning, coercing to error",
                rule.id
            );
            Severity::Error
        }
    }
}

/// The full line of text containing `offset`.
fn enclosing_line(source: &str, offset: usize) -> &str {
    let start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = source[offset..]
        .find('\n')
        .map(|i| offset + i)
        .unwrap_or(source.len());
    &source[start..end]
}
