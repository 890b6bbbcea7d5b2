//! Semantic checker: naming conventions and type discipline.
//!
//! Two checks: `naming` enforces camelCase on function declaration
//! names and top-level variable identifiers (ALL_CAPS constants and
//! `_`-prefixed names are exempt); `type_consistency` flags explicit
//! `any` annotations and unchecked type assertions. Neither performs
//! type inference; both are purely syntactic.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::Node;

use crate::analysis::SyntaxModel;
use crate::config::SemanticConfig;

use super::{AnalysisContext, Issue, IssueKind, Location, Severity};

/// Check identifiers accepted in the config's `enabled_checks` list.
pub mod checks {
    pub const NAMING: &str = "naming";
    pub const TYPE_CONSISTENCY: &str = "type_consistency";
}

/// Stable rule ids.
pub mod rules {
    pub const NAMING: &str = "identifier_naming";
    pub const ANY_TYPE: &str = "any_type";
    pub const TYPE_ASSERTION: &str = "type_assertion";
}

static CAMEL_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("camelCase pattern"));
static CONST_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("constant pattern"));

/// Run the enabled semantic checks.
///
/// Unknown check identifiers are skipped with a diagnostic, never an
/// error.
pub fn check(model: &SyntaxModel, config: &SemanticConfig) -> anyhow::Result<AnalysisContext> {
    let mut ctx = AnalysisContext::new();

    for check_id in &config.enabled_checks {
        match check_id.as_str() {
            checks::NAMING => check_naming(model, config.naming_severity, &mut ctx),
            checks::TYPE_CONSISTENCY => {
                check_types(model, config.any_type_severity, &mut ctx)
            }
            other => warn!("unknown semantic check {:?}, skipping", other),
        }
    }

    Ok(ctx)
}

/// Whether an identifier satisfies the naming convention.
fn name_is_acceptable(name: &str) -> bool {
    name.starts_with('_') || CAMEL_CASE.is_match(name) || CONST_CASE.is_match(name)
}

/// camelCase rewrite suggestion: lower-case the first character only.
fn camel_suggestion(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn check_naming(model: &SyntaxModel, severity: Severity, ctx: &mut AnalysisContext) {
    // Function declaration names, at any depth.
    model.for_each_node(|node| {
        if matches!(
            node.kind(),
            "function_declaration" | "generator_function_declaration"
        ) {
            if let Some(name_node) = node.child_by_field_name("name") {
                report_bad_name(model, name_node, "function", severity, ctx);
            }
        }
    });

    // Top-level variable identifiers only; locals are the function
    // author's business.
    let root = model.root();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let decl = if child.kind() == "export_statement" {
            match child.child_by_field_name("declaration") {
                Some(d) => d,
                None => continue,
            }
        } else {
            child
        };

        if matches!(decl.kind(), "lexical_declaration" | "variable_declaration") {
            let mut decl_cursor = decl.walk();
            for declarator in decl.named_children(&mut decl_cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                if let Some(name_node) = declarator.child_by_field_name("name") {
                    // Destructuring patterns are left alone.
                    if name_node.kind() == "identifier" {
                        report_bad_name(model, name_node, "variable", severity, ctx);
                    }
                }
            }
        }
    }
}

fn report_bad_name(
    model: &SyntaxModel,
    name_node: Node,
    what: &str,
    severity: Severity,
    ctx: &mut AnalysisContext,
) {
    let name = model.node_text(name_node);
    if name.is_empty() || name_is_acceptable(name) {
        return;
    }

    let pos = name_node.start_position();
    ctx.metrics.naming_violations += 1;
    ctx.push_issue(Issue {
        kind: IssueKind::Semantic,
        severity,
        location: Location {
            file: model.path().to_string(),
            line: pos.row + 1,
            column: pos.column + 1,
        },
        rule_id: rules::NAMING.to_string(),
        message: format!("{} '{}' is not camelCase", what, name),
        suggestion: Some(format!("rename to '{}'", camel_suggestion(name))),
        snippet: None,
    });
}

fn check_types(model: &SyntaxModel, any_severity: Severity, ctx: &mut AnalysisContext) {
    model.for_each_node(|node| match node.kind() {
        "predefined_type" => {
            if model.node_text(node) == "any" {
                push_type_issue(
                    model,
                    node,
                    any_severity,
                    rules::ANY_TYPE,
                    "explicit 'any' disables type checking here".to_string(),
                    "Name the concrete type, or use 'unknown' and narrow it",
                    ctx,
                );
            }
        }
        "as_expression" => {
            // `x as const` narrows rather than bypasses; only a named
            // target type is an unchecked assertion.
            let target = node.named_child(1);
            let is_const_assertion =
                target.map(|t| model.node_text(t) == "const").unwrap_or(true);
            if !is_const_assertion {
                push_type_issue(
                    model,
                    node,
                    Severity::Warning,
                    rules::TYPE_ASSERTION,
                    format!("unchecked type assertion '{}'", model.node_text(node)),
                    "Validate the value instead of asserting its type",
                    ctx,
                );
            }
        }
        "type_assertion" => {
            push_type_issue(
                model,
                node,
                Severity::Warning,
                rules::TYPE_ASSERTION,
                format!("unchecked type assertion '{}'", model.node_text(node)),
                "Validate the value instead of asserting its type",
                ctx,
            );
        }
        _ => {}
    });
}

fn push_type_issue(
    model: &SyntaxModel,
    node: Node,
    severity: Severity,
    rule_id: &str,
    message: String,
    suggestion: &str,
    ctx: &mut AnalysisContext,
) {
    let pos = node.start_position();
    ctx.metrics.type_violations += 1;
    ctx.push_issue(Issue {
        kind: IssueKind::Semantic,
        severity,
        location: Location {
            file: model.path().to_string(),
            line: pos.row + 1,
            column: pos.column + 1,
        },
        rule_id: rule_id.to_string(),
        message,
        suggestion: Some(suggestion.to_string()),
        snippet: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> AnalysisContext {
        run_with(source, &SemanticConfig::default())
    }

    fn run_with(source: &str, config: &SemanticConfig) -> AnalysisContext {
        let model = SyntaxModel::parse("test.ts", source).unwrap();
        check(&model, config).unwrap()
    }

    #[test]
    fn test_camel_case_names_pass() {
        let ctx = run("function doWork() {}\nconst itemCount = 1;\n");
        assert!(ctx.issues.is_empty());
    }

    #[test]
    fn test_pascal_case_function_flagged_with_suggestion() {
        let ctx = run("function DoWork() {}");
        assert_eq!(ctx.issues.len(), 1);
        let issue = &ctx.issues[0];
        assert_eq!(issue.rule_id, rules::NAMING);
        assert_eq!(issue.suggestion.as_deref(), Some("rename to 'doWork'"));
        assert_eq!(ctx.metrics.naming_violations, 1);
    }

    #[test]
    fn test_all_caps_and_underscore_prefix_exempt() {
        let ctx = run("const MAX_RETRIES = 3;\nconst _internal = 1;\n");
        assert!(ctx.issues.is_empty());
    }

    #[test]
    fn test_local_variables_are_not_checked() {
        let ctx = run("function f() { const BadLocal = 1; return BadLocal; }");
        assert!(ctx.issues.is_empty());
    }

    #[test]
    fn test_nested_function_declaration_names_are_checked() {
        let ctx = run("function outer() { function Inner() {} }");
        assert_eq!(ctx.issues.len(), 1);
        assert!(ctx.issues[0].message.contains("Inner"));
    }

    #[test]
    fn test_exported_variable_is_checked() {
        let ctx = run("export const Bad_Export = 1;");
        assert_eq!(ctx.issues.len(), 1);
    }

    #[test]
    fn test_any_annotations_counted_per_occurrence() {
        let ctx = run("function f(a: any, b: any): number { return 0; }");
        let any_issues: Vec<_> = ctx
            .issues
            .iter()
            .filter(|i| i.rule_id == rules::ANY_TYPE)
            .collect();
        assert_eq!(any_issues.len(), 2);
        assert_eq!(ctx.metrics.type_violations, 2);
    }

    #[test]
    fn test_as_assertion_is_always_warning() {
        let config = SemanticConfig {
            any_type_severity: Severity::Error,
            ..Default::default()
        };
        let ctx = run_with("const y = x as string;", &config);
        let issue = ctx
            .issues
            .iter()
            .find(|i| i.rule_id == rules::TYPE_ASSERTION)
            .unwrap();
        assert_eq!(issue.severity, Severity::Warning);
    }

    #[test]
    fn test_angle_bracket_assertion_flagged() {
        let ctx = run("const y = <string>x;");
        assert!(ctx
            .issues
            .iter()
            .any(|i| i.rule_id == rules::TYPE_ASSERTION));
    }

    #[test]
    fn test_as_const_is_exempt() {
        let ctx = run("const modes = ['a', 'b'] as const;");
        assert!(ctx
            .issues
            .iter()
            .all(|i| i.rule_id != rules::TYPE_ASSERTION));
    }

    #[test]
    fn test_unknown_check_id_is_skipped() {
        let config = SemanticConfig {
            enabled_checks: vec!["no_such_check".to_string()],
            ..Default::default()
        };
        let ctx = run_with("function Bad() {}", &config);
        assert!(ctx.issues.is_empty());
    }

    #[test]
    fn test_naming_severity_follows_config() {
        let config = SemanticConfig {
            naming_severity: Severity::Error,
            ..Default::default()
        };
        let ctx = run_with("function Bad() {}", &config);
        assert_eq!(ctx.issues[0].severity, Severity::Error);
    }
}
