//! Complexity checker: per-function metric thresholds.

use crate::analysis::FunctionInfo;
use crate::config::ComplexityThresholds;

use super::{AnalysisContext, Issue, IssueKind, Location, Severity};

/// Stable rule ids, one per metric kind.
pub mod rules {
    pub const CYCLOMATIC: &str = "cyclomatic_complexity";
    pub const COGNITIVE: &str = "cognitive_complexity";
    pub const NESTING: &str = "nesting_depth";
    pub const PARAMETERS: &str = "parameter_count";
    pub const LENGTH: &str = "function_length";
}

/// Compare every extracted function against the configured thresholds.
///
/// Each exceeded metric emits exactly one issue. By default cyclomatic
/// and cognitive overruns are errors while nesting, parameter, and
/// length overruns are warnings; `severity_overrides` can move any
/// rule.
pub fn check(
    file: &str,
    functions: &[FunctionInfo],
    thresholds: &ComplexityThresholds,
) -> anyhow::Result<AnalysisContext> {
    let mut ctx = AnalysisContext::new();
    ctx.metrics.function_count = functions.len();

    for func in functions {
        ctx.metrics.max_cyclomatic_complexity = ctx
            .metrics
            .max_cyclomatic_complexity
            .max(func.cyclomatic_complexity);
        ctx.metrics.max_cognitive_complexity = ctx
            .metrics
            .max_cognitive_complexity
            .max(func.cognitive_complexity);
        ctx.metrics.max_nesting_depth = ctx.metrics.max_nesting_depth.max(func.nesting_depth);
        ctx.metrics.max_parameter_count =
            ctx.metrics.max_parameter_count.max(func.parameter_count);
        ctx.metrics.max_function_length =
            ctx.metrics.max_function_length.max(func.length_in_lines);

        if func.cyclomatic_complexity > thresholds.max_cyclomatic_complexity {
            ctx.metrics.functions_over_complexity += 1;
            ctx.push_issue(metric_issue(
                file,
                func,
                rules::CYCLOMATIC,
                thresholds.severity_for(rules::CYCLOMATIC, Severity::Error),
                format!(
                    "function '{}' has cyclomatic complexity {} (max {})",
                    func.name, func.cyclomatic_complexity, thresholds.max_cyclomatic_complexity
                ),
                "Break the function into smaller functions",
            ));
        }

        if func.cognitive_complexity > thresholds.max_cognitive_complexity {
            ctx.push_issue(metric_issue(
                file,
                func,
                rules::COGNITIVE,
                thresholds.severity_for(rules::COGNITIVE, Severity::Error),
                format!(
                    "function '{}' has cognitive complexity {} (max {})",
                    func.name, func.cognitive_complexity, thresholds.max_cognitive_complexity
                ),
                "Flatten nested control flow and extract helpers",
            ));
        }

        if func.nesting_depth > thresholds.max_nesting_depth {
            ctx.push_issue(metric_issue(
                file,
                func,
                rules::NESTING,
                thresholds.severity_for(rules::NESTING, Severity::Warning),
                format!(
                    "function '{}' has nesting depth {} (max {})",
                    func.name, func.nesting_depth, thresholds.max_nesting_depth
                ),
                "Use early returns or extract the nested logic",
            ));
        }

        if func.parameter_count > thresholds.max_parameter_count {
            ctx.push_issue(metric_issue(
                file,
                func,
                rules::PARAMETERS,
                thresholds.severity_for(rules::PARAMETERS, Severity::Warning),
                format!(
                    "function '{}' takes {} parameters (max {})",
                    func.name, func.parameter_count, thresholds.max_parameter_count
                ),
                "Group related parameters into an options object",
            ));
        }

        if func.length_in_lines > thresholds.max_function_lines {
            ctx.push_issue(metric_issue(
                file,
                func,
                rules::LENGTH,
                thresholds.severity_for(rules::LENGTH, Severity::Warning),
                format!(
                    "function '{}' is {} lines long (max {})",
                    func.name, func.length_in_lines, thresholds.max_function_lines
                ),
                "Split the function along its logical sections",
            ));
        }
    }

    Ok(ctx)
}

fn metric_issue(
    file: &str,
    func: &FunctionInfo,
    rule_id: &str,
    severity: Severity,
    message: String,
    suggestion: &str,
) -> Issue {
    Issue {
        kind: IssueKind::Complexity,
        severity,
        location: Location {
            file: file.to_string(),
            line: func.start_line,
            column: func.start_column,
        },
        rule_id: rule_id.to_string(),
        message,
        suggestion: Some(suggestion.to_string()),
        snippet: None,
    }
}
