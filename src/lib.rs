//! Changegate - static quality gate for proposed code changes.
//!
//! Changegate analyzes a single proposed TypeScript/JavaScript source
//! file, decides whether to allow, deny, or ask for human confirmation,
//! and on denial produces a structured correction prompt while keeping
//! retry state per editing session. After a bounded number of denials
//! for one session the gate fails open: it must never block forever.
//!
//! # Architecture
//!
//! - `analysis`: tree-sitter syntax model and per-function metrics
//! - `check`: the three checkers (complexity, security, semantic) and
//!   their shared issue/metrics types
//! - `judge`: folds checker output and a test outcome into a decision
//! - `feedback`: deterministic correction-message rendering
//! - `retry`: persisted per-session retry state behind a store trait
//! - `gate`: the public validate entry point tying it all together
//! - `config`, `report`, `cli`, `testrun`: boundary plumbing
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use changegate::{Config, Decision, Gate, MemoryRetryStore, ValidationRequest};
//!
//! let gate = Gate::new(Config::default(), Arc::new(MemoryRetryStore::new()));
//! let verdict = gate.validate(&ValidationRequest {
//!     file_path: "src/db.ts",
//!     content: "db.query(`SELECT * FROM t WHERE id = ${id}`);",
//!     session_id: "session-1",
//!     test_outcome: None,
//! });
//! assert_eq!(verdict.decision, Decision::Deny);
//! ```

pub mod analysis;
pub mod check;
pub mod cli;
pub mod config;
pub mod feedback;
pub mod gate;
pub mod judge;
pub mod report;
pub mod retry;
pub mod testrun;

pub use analysis::{FunctionInfo, ParseFailure, SyntaxModel};
pub use check::{Issue, IssueKind, Location, Metrics, SecurityCategory, Severity};
pub use config::Config;
pub use gate::{Gate, ValidationRequest};
pub use judge::{Decision, Verdict};
pub use retry::{Attempt, FileRetryStore, MemoryRetryStore, RetryState, RetryStore};
pub use testrun::{TestFailure, TestOutcome};
