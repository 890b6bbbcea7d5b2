//! The gate: one validation entry point per proposed change.
//!
//! Wires the decision engine to the feedback loop. The gate itself is
//! a pure function of its inputs plus the injected retry store; the
//! store is the only cross-call state, and a broken store degrades to
//! "no prior state" rather than changing any decision.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::config::Config;
use crate::feedback;
use crate::judge::{self, Decision, Verdict};
use crate::retry::{content_hash, unix_timestamp, Attempt, RetryState, RetryStore};
use crate::testrun::TestOutcome;

/// One proposed change to validate.
#[derive(Debug, Clone)]
pub struct ValidationRequest<'a> {
    pub file_path: &'a str,
    /// The full proposed file content, not a diff.
    pub content: &'a str,
    /// Editing session the retry state is keyed by.
    pub session_id: &'a str,
    pub test_outcome: Option<TestOutcome>,
}

/// The quality gate.
pub struct Gate {
    config: Config,
    store: Arc<dyn RetryStore>,
    /// Per-session locks so concurrent denials for one session cannot
    /// lose an increment during read-modify-write.
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Gate {
    pub fn new(config: Config, store: Arc<dyn RetryStore>) -> Self {
        Self {
            config,
            store,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate one proposed change.
    ///
    /// Allow deletes any retry state for the session; deny updates it
    /// and renders the correction prompt; ask leaves it untouched.
    pub fn validate(&self, request: &ValidationRequest) -> Verdict {
        let mut verdict = judge::evaluate(
            request.file_path,
            request.content,
            &self.config,
            request.test_outcome.as_ref(),
        );

        match verdict.decision {
            Decision::Ask => verdict,
            Decision::Allow => {
                if let Err(e) = self.store.delete(request.session_id) {
                    warn!(
                        "failed to clear retry state for session {:?}: {}",
                        request.session_id, e
                    );
                }
                verdict.message = feedback::allow_message(&verdict.issues);
                verdict
            }
            Decision::Deny => self.handle_denial(request, verdict),
        }
    }

    fn handle_denial(&self, request: &ValidationRequest, mut verdict: Verdict) -> Verdict {
        let lock = self.session_lock(request.session_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut state = match self.store.load(request.session_id) {
            Ok(Some(state)) => state,
            Ok(None) => RetryState::new(request.session_id, self.config.max_retries),
            Err(e) => {
                warn!(
                    "failed to load retry state for session {:?}, treating as none: {}",
                    request.session_id, e
                );
                RetryState::new(request.session_id, self.config.max_retries)
            }
        };

        // Fail open: the gate must never block forever.
        if state.is_exhausted() {
            if let Err(e) = self.store.delete(request.session_id) {
                warn!(
                    "failed to clear exhausted retry state for session {:?}: {}",
                    request.session_id, e
                );
            }
            verdict.decision = Decision::Allow;
            verdict.message = feedback::fail_open_message(state.max_retries);
            return verdict;
        }

        state.record_denial(Attempt {
            timestamp: unix_timestamp(),
            file_path: request.file_path.to_string(),
            content_hash: content_hash(request.content),
            issues: verdict.issues.clone(),
        });

        if let Err(e) = self.store.save(&state) {
            warn!(
                "failed to save retry state for session {:?}, skipping: {}",
                request.session_id, e
            );
        }

        verdict.message = feedback::denial_message(
            &verdict.issues,
            request.test_outcome.as_ref(),
            state.retry_count,
            state.max_retries,
            verdict.confidence,
        );
        verdict
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::MemoryRetryStore;

    const DENIED_SOURCE: &str = "db.query(`SELECT * FROM t WHERE id = ${id}`);";
    const CLEAN_SOURCE: &str = "function add(a: number, b: number) { return a + b; }";

    fn gate() -> (Gate, Arc<MemoryRetryStore>) {
        let store = Arc::new(MemoryRetryStore::new());
        (Gate::new(Config::default(), store.clone()), store)
    }

    fn request<'a>(content: &'a str, session: &'a str) -> ValidationRequest<'a> {
        ValidationRequest {
            file_path: "src/db.ts",
            content,
            session_id: session,
            test_outcome: None,
        }
    }

    #[test]
    fn test_denial_creates_state_and_renders_prompt() {
        let (gate, store) = gate();
        let verdict = gate.validate(&request(DENIED_SOURCE, "s1"));
        assert_eq!(verdict.decision, Decision::Deny);
        assert!(verdict.message.contains("Change denied"));
        assert!(verdict.message.contains("sql_injection"));
        assert!(verdict.message.contains("Attempt 1 of 3"));

        let state = store.load("s1").unwrap().unwrap();
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.previous_attempts.len(), 1);
        assert_eq!(
            state.previous_attempts[0].content_hash,
            content_hash(DENIED_SOURCE)
        );
    }

    #[test]
    fn test_retry_count_increments_per_denial() {
        let (gate, store) = gate();
        for expected in 1..=3 {
            gate.validate(&request(DENIED_SOURCE, "s1"));
            let state = store.load("s1").unwrap().unwrap();
            assert_eq!(state.retry_count, expected);
        }
    }

    #[test]
    fn test_fail_open_after_max_retries() {
        let (gate, store) = gate();
        for _ in 0..3 {
            let verdict = gate.validate(&request(DENIED_SOURCE, "s1"));
            assert_eq!(verdict.decision, Decision::Deny);
        }

        // Fourth denial fails open and clears the state.
        let verdict = gate.validate(&request(DENIED_SOURCE, "s1"));
        assert_eq!(verdict.decision, Decision::Allow);
        assert!(verdict.message.contains("retry limit"));
        assert!(store.load("s1").unwrap().is_none());

        // The counter starts over afterwards.
        let verdict = gate.validate(&request(DENIED_SOURCE, "s1"));
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(store.load("s1").unwrap().unwrap().retry_count, 1);
    }

    #[test]
    fn test_allow_clears_state() {
        let (gate, store) = gate();
        gate.validate(&request(DENIED_SOURCE, "s1"));
        assert!(store.load("s1").unwrap().is_some());

        let verdict = gate.validate(&request(CLEAN_SOURCE, "s1"));
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.message, "Change allowed.");
        assert!(store.load("s1").unwrap().is_none());
    }

    #[test]
    fn test_allow_with_absent_state_is_fine() {
        let (gate, _store) = gate();
        let verdict = gate.validate(&request(CLEAN_SOURCE, "fresh"));
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[test]
    fn test_sessions_are_independent() {
        let (gate, store) = gate();
        gate.validate(&request(DENIED_SOURCE, "s1"));
        gate.validate(&request(DENIED_SOURCE, "s1"));
        gate.validate(&request(DENIED_SOURCE, "s2"));

        assert_eq!(store.load("s1").unwrap().unwrap().retry_count, 2);
        assert_eq!(store.load("s2").unwrap().unwrap().retry_count, 1);
    }

    #[test]
    fn test_concurrent_denials_do_not_lose_increments() {
        let store = Arc::new(MemoryRetryStore::new());
        let mut config = Config::default();
        config.max_retries = 100; // keep fail-open out of the picture
        let gate = Arc::new(Gate::new(config, store.clone()));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let gate = gate.clone();
                scope.spawn(move || {
                    gate.validate(&request(DENIED_SOURCE, "shared"));
                });
            }
        });

        // Every denial must be counted: no two threads may both read
        // retry_count = N and both write N + 1.
        let state = store.load("shared").unwrap().unwrap();
        assert_eq!(state.retry_count, 8);
    }
}
