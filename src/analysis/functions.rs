//! Function extraction and per-function metrics.
//!
//! Walks a [`SyntaxModel`] and produces one [`FunctionInfo`] record per
//! function-like construct: declarations, function expressions, arrow
//! functions, methods, and generators, at any nesting depth. A function
//! nested inside another yields two independent records.
//!
//! Metric traversal never descends into a nested function-like node, so
//! an outer function's numbers do not double-count the decision points
//! of the functions defined inside it.

use tree_sitter::Node;

use super::model::SyntaxModel;

/// Node kinds treated as function-like.
const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// Structural constructs that count toward cyclomatic complexity,
/// cognitive complexity, and nesting depth.
const NESTING_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "for_of_statement",
    "while_statement",
    "do_statement",
    "switch_case",
    "catch_clause",
];

pub fn is_function_like(kind: &str) -> bool {
    FUNCTION_KINDS.contains(&kind)
}

fn is_nesting_construct(kind: &str) -> bool {
    NESTING_KINDS.contains(&kind)
}

/// Metrics and position info for one function-like node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub nesting_depth: u32,
    pub parameter_count: u32,
    pub length_in_lines: u32,
}

/// Extract every function-like construct with its metrics.
///
/// Records appear in source order (pre-order discovery).
pub fn extract(model: &SyntaxModel) -> Vec<FunctionInfo> {
    let mut infos = Vec::new();
    model.for_each_node(|node| {
        if is_function_like(node.kind()) {
            infos.push(function_info(model, node));
        }
    });
    infos
}

fn function_info(model: &SyntaxModel, node: Node) -> FunctionInfo {
    let start = node.start_position();
    let end = node.end_position();

    let mut walker = MetricsWalker::default();
    walker.walk_children(node, 0);

    FunctionInfo {
        name: function_name(model, node),
        start_line: start.row + 1,
        start_column: start.column + 1,
        end_line: end.row + 1,
        end_column: end.column + 1,
        cyclomatic_complexity: walker.cyclomatic,
        cognitive_complexity: walker.cognitive,
        nesting_depth: walker.max_nesting,
        parameter_count: parameter_count(node),
        length_in_lines: (end.row - start.row + 1) as u32,
    }
}

/// Resolve a function's name: its own `name` field, or the binding it
/// is assigned to, or `<anonymous>`.
fn function_name(model: &SyntaxModel, node: Node) -> String {
    if let Some(name) = node.child_by_field_name("name") {
        return model.node_text(name).to_string();
    }

    if let Some(parent) = node.parent() {
        match parent.kind() {
            "variable_declarator" => {
                if let Some(name) = parent.child_by_field_name("name") {
                    return model.node_text(name).to_string();
                }
            }
            "pair" => {
                if let Some(key) = parent.child_by_field_name("key") {
                    return model.node_text(key).to_string();
                }
            }
            "assignment_expression" => {
                if let Some(left) = parent.child_by_field_name("left") {
                    return model.node_text(left).to_string();
                }
            }
            _ => {}
        }
    }

    "<anonymous>".to_string()
}

/// Count declared parameters. Defaults and rest parameters each count
/// as one.
fn parameter_count(node: Node) -> u32 {
    if let Some(params) = node.child_by_field_name("parameters") {
        return params.named_child_count() as u32;
    }
    // Arrow function shorthand: `x => x + 1` has a bare `parameter`.
    if node.child_by_field_name("parameter").is_some() {
        return 1;
    }
    0
}

/// Recursive metric accumulator for one function body.
///
/// Cyclomatic starts at base 1; cognitive starts at 0 with a nesting
/// counter that is local to each branch: recursion restores the level
/// when a subtree is done.
#[derive(Debug)]
struct MetricsWalker {
    cyclomatic: u32,
    cognitive: u32,
    max_nesting: u32,
}

impl Default for MetricsWalker {
    fn default() -> Self {
        Self {
            cyclomatic: 1,
            cognitive: 0,
            max_nesting: 0,
        }
    }
}

impl MetricsWalker {
    fn walk_children(&mut self, node: Node, nesting: u32) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, nesting);
        }
    }

    fn visit(&mut self, node: Node, nesting: u32) {
        let kind = node.kind();

        // Nested functions get their own independent record; their
        // decision points must not leak into the outer function.
        if is_function_like(kind) {
            return;
        }

        if is_nesting_construct(kind) {
            self.cyclomatic += 1;
            self.cognitive += 1 + nesting;
            let depth = nesting + 1;
            self.max_nesting = self.max_nesting.max(depth);
            self.walk_children(node, depth);
            return;
        }

        match kind {
            "ternary_expression" => {
                self.cyclomatic += 1;
                self.walk_children(node, nesting);
            }
            "binary_expression" => {
                if let Some(op) = node.child_by_field_name("operator") {
                    if matches!(op.kind(), "&&" | "||") {
                        self.cyclomatic += 1;
                        self.cognitive += 1;
                    }
                }
                self.walk_children(node, nesting);
            }
            _ => self.walk_children(node, nesting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_from(source: &str) -> Vec<FunctionInfo> {
        let model = SyntaxModel::parse("test.ts", source).unwrap();
        extract(&model)
    }

    fn single(source: &str) -> FunctionInfo {
        let infos = extract_from(source);
        assert_eq!(infos.len(), 1, "expected one function in {:?}", source);
        infos.into_iter().next().unwrap()
    }

    #[test]
    fn test_straight_line_function_baseline() {
        let info = single("function add(a: number, b: number) {\n  return a + b;\n}");
        assert_eq!(info.name, "add");
        assert_eq!(info.cyclomatic_complexity, 1);
        assert_eq!(info.cognitive_complexity, 0);
        assert_eq!(info.nesting_depth, 0);
        assert_eq!(info.parameter_count, 2);
        assert_eq!(info.length_in_lines, 3);
        assert_eq!(info.start_line, 1);
        assert_eq!(info.start_column, 1);
    }

    #[test]
    fn test_cyclomatic_counts_decision_points() {
        // 1 base + if + for + while + case + catch + ternary = 7
        let info = single(
            r#"function f(x) {
  if (x) {}
  for (let i = 0; i < x; i++) {}
  while (x) {}
  switch (x) { case 1: break; default: break; }
  try {} catch (e) {}
  return x ? 1 : 2;
}"#,
        );
        assert_eq!(info.cyclomatic_complexity, 7);
    }

    #[test]
    fn test_logical_operators_count_per_token() {
        // 1 base + 3 operator tokens
        let info = single("function f(a, b, c, d) {\n  return a && b || c && d;\n}");
        assert_eq!(info.cyclomatic_complexity, 4);
        // Each token adds a flat 1 to cognitive.
        assert_eq!(info.cognitive_complexity, 3);
    }

    #[test]
    fn test_switch_itself_contributes_nothing() {
        // 1 base + two case clauses; default is not a case clause.
        let info = single(
            "function f(x) {\n  switch (x) {\n    case 1: return 1;\n    case 2: return 2;\n    default: return 0;\n  }\n}",
        );
        assert_eq!(info.cyclomatic_complexity, 3);
    }

    #[test]
    fn test_cognitive_complexity_scales_with_nesting() {
        // outer if: 1 + 0, inner if: 1 + 1 -> 3
        let info = single("function f(x) {\n  if (x) {\n    if (x > 1) {}\n  }\n}");
        assert_eq!(info.cognitive_complexity, 3);
        assert_eq!(info.nesting_depth, 2);
    }

    #[test]
    fn test_nesting_restores_for_sibling_branches() {
        // Two sibling ifs at top level: both at nesting 0, so each adds
        // 1 and the depth never exceeds 1.
        let info = single("function f(x) {\n  if (x) {}\n  if (!x) {}\n}");
        assert_eq!(info.cognitive_complexity, 2);
        assert_eq!(info.nesting_depth, 1);
    }

    #[test]
    fn test_deeply_nested_ifs_report_full_depth() {
        let info = single(
            "function f(x){ if(x>0){ if(x>10){ if(x>20){ if(x>30){ if(x>40){ return x; } } } } } return 0; }",
        );
        assert_eq!(info.nesting_depth, 5);
    }

    #[test]
    fn test_flattened_early_returns_report_depth_one() {
        let info = single(
            "function f(x){ if(x<=0) return 0; if(x<=10) return 0; if(x<=20) return 0; return x; }",
        );
        assert_eq!(info.nesting_depth, 1);
    }

    #[test]
    fn test_nested_function_metrics_are_independent() {
        let infos = extract_from(
            r#"function outer() {
  function inner(x) {
    if (x) { return 1; }
    return 0;
  }
  return inner(1);
}"#,
        );
        assert_eq!(infos.len(), 2);
        let outer = infos.iter().find(|f| f.name == "outer").unwrap();
        let inner = infos.iter().find(|f| f.name == "inner").unwrap();
        // The inner if belongs to inner only.
        assert_eq!(outer.cyclomatic_complexity, 1);
        assert_eq!(outer.nesting_depth, 0);
        assert_eq!(inner.cyclomatic_complexity, 2);
    }

    #[test]
    fn test_arrow_and_method_extraction() {
        let infos = extract_from(
            r#"const greet = (name: string) => name.length > 0 ? name : "anon";
class Service {
  handle(req) { if (req) {} }
}"#,
        );
        let greet = infos.iter().find(|f| f.name == "greet").unwrap();
        assert_eq!(greet.parameter_count, 1);
        assert_eq!(greet.cyclomatic_complexity, 2); // base + ternary

        let handle = infos.iter().find(|f| f.name == "handle").unwrap();
        assert_eq!(handle.cyclomatic_complexity, 2);
    }

    #[test]
    fn test_anonymous_function_expression() {
        let infos = extract_from("setTimeout(function () { return 1; }, 10);");
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "<anonymous>");
    }

    #[test]
    fn test_defaults_and_rest_each_count_one() {
        let info = single("function f(a, b = 2, ...rest) {}");
        assert_eq!(info.parameter_count, 3);
    }

    #[test]
    fn test_shorthand_arrow_parameter() {
        let infos = extract_from("const double = x => x * 2;");
        assert_eq!(infos[0].parameter_count, 1);
    }

    #[test]
    fn test_ternary_adds_no_cognitive() {
        let info = single("function f(x) { return x ? 1 : 2; }");
        assert_eq!(info.cyclomatic_complexity, 2);
        assert_eq!(info.cognitive_complexity, 0);
    }
}
