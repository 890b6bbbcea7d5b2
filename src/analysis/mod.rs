//! AST-backed analysis plumbing.
//!
//! [`SyntaxModel`] wraps one tree-sitter parse of a proposed source
//! text; [`extract`] walks it and produces per-function metrics. Both
//! are created per validation call and hold no cross-call state.

mod functions;
mod model;

pub use functions::{extract, is_function_like, FunctionInfo};
pub use model::{ParseFailure, SourceLanguage, SyntaxModel};
