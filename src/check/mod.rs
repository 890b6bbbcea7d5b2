//! Checkers that consume a syntax model and emit issues.
//!
//! Each checker is independent: it reads the model (and, for
//! complexity, the extracted function metrics), returns its own
//! [`AnalysisContext`], and the judge merges the results in a fixed
//! order so the final issue list is deterministic.

pub mod complexity;
pub mod security;
pub mod semantic;
mod types;

pub use types::{
    AnalysisContext, CategoryCounts, Issue, IssueKind, Location, Metrics, SecurityCategory,
    Severity, SeverityCounts,
};
