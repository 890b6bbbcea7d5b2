//! Persisted retry state, keyed by editing session.
//!
//! One [`RetryState`] record exists per session id while that session
//! keeps getting denied. The store is injected as a capability: the
//! gate never touches the filesystem directly, and a store failure is
//! always survivable (the gate degrades to "no prior state").
//!
//! [`FileRetryStore`] keeps one JSON file per session and replaces it
//! atomically (write to a temp file, then rename), so a crash mid-save
//! leaves the previous record intact.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::check::Issue;

/// Maximum attempts kept per session; the oldest is evicted first.
pub const MAX_ATTEMPT_HISTORY: usize = 5;

/// One denied validation pass.
///
/// Stores a content hash rather than the content itself to bound
/// memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub timestamp: u64,
    pub file_path: String,
    pub content_hash: String,
    pub issues: Vec<Issue>,
}

/// Cross-call retry memory for one editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryState {
    pub session_id: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_failure_at: u64,
    /// Issues from the most recent denial.
    pub issues_detected: Vec<Issue>,
    /// Ring of recent attempts, capped at [`MAX_ATTEMPT_HISTORY`].
    pub previous_attempts: Vec<Attempt>,
}

impl RetryState {
    pub fn new(session_id: &str, max_retries: u32) -> Self {
        Self {
            session_id: session_id.to_string(),
            retry_count: 0,
            max_retries,
            last_failure_at: 0,
            issues_detected: Vec::new(),
            previous_attempts: Vec::new(),
        }
    }

    /// Record one denial: increments the retry count exactly once and
    /// appends the attempt, evicting the oldest entry past the cap.
    pub fn record_denial(&mut self, attempt: Attempt) {
        self.retry_count += 1;
        self.last_failure_at = attempt.timestamp;
        self.issues_detected = attempt.issues.clone();
        self.previous_attempts.push(attempt);
        while self.previous_attempts.len() > MAX_ATTEMPT_HISTORY {
            self.previous_attempts.remove(0);
        }
    }

    /// Whether the session has used up its retries.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Hex-encoded SHA-256 of a proposed content.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Current Unix timestamp in seconds.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Capability interface for retry-state persistence.
pub trait RetryStore: Send + Sync {
    /// Load the state for a session, `None` if absent.
    fn load(&self, session_id: &str) -> anyhow::Result<Option<RetryState>>;
    /// Save a state, replacing any previous record for its session.
    fn save(&self, state: &RetryState) -> anyhow::Result<()>;
    /// Delete a session's state. Deleting an absent record is fine.
    fn delete(&self, session_id: &str) -> anyhow::Result<()>;
}

/// File-backed store: one JSON file per session id.
pub struct FileRetryStore {
    dir: PathBuf,
}

impl FileRetryStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Store rooted at the user's cache directory
    /// (`~/.cache/changegate/sessions` on Linux).
    pub fn default_location() -> Option<Self> {
        ProjectDirs::from("", "", "changegate")
            .map(|dirs| Self::new(dirs.cache_dir().join("sessions")))
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        // Session ids come from the caller; keep filenames tame.
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl RetryStore for FileRetryStore {
    fn load(&self, session_id: &str) -> anyhow::Result<Option<RetryState>> {
        let path = self.session_path(session_id);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: RetryState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    fn save(&self, state: &RetryState) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.session_path(&state.session_id);
        let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&tmp, json)?;
        // Atomic replace: a reader sees either the old record or the
        // new one, never a torn write.
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, session_id: &str) -> anyhow::Result<()> {
        let path = self.session_path(session_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryRetryStore {
    states: RwLock<HashMap<String, RetryState>>,
}

impl MemoryRetryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RetryStore for MemoryRetryStore {
    fn load(&self, session_id: &str) -> anyhow::Result<Option<RetryState>> {
        let states = self
            .states
            .read()
            .map_err(|_| anyhow::anyhow!("retry store lock poisoned"))?;
        Ok(states.get(session_id).cloned())
    }

    fn save(&self, state: &RetryState) -> anyhow::Result<()> {
        let mut states = self
            .states
            .write()
            .map_err(|_| anyhow::anyhow!("retry store lock poisoned"))?;
        states.insert(state.session_id.clone(), state.clone());
        Ok(())
    }

    fn delete(&self, session_id: &str) -> anyhow::Result<()> {
        let mut states = self
            .states
            .write()
            .map_err(|_| anyhow::anyhow!("retry store lock poisoned"))?;
        states.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{IssueKind, Location, Severity};
    use tempfile::TempDir;

    fn attempt(n: u64) -> Attempt {
        Attempt {
            timestamp: n,
            file_path: "a.ts".to_string(),
            content_hash: content_hash(&format!("content-{}", n)),
            issues: vec![Issue {
                kind: IssueKind::Security,
                severity: Severity::Error,
                location: Location {
                    file: "a.ts".to_string(),
                    line: 1,
                    column: 1,
                },
                rule_id: "weak_hash".to_string(),
                message: "m".to_string(),
                suggestion: None,
                snippet: None,
            }],
        }
    }

    #[test]
    fn test_record_denial_increments_once() {
        let mut state = RetryState::new("s1", 3);
        assert_eq!(state.retry_count, 0);
        state.record_denial(attempt(10));
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.last_failure_at, 10);
        assert_eq!(state.issues_detected.len(), 1);
        state.record_denial(attempt(20));
        assert_eq!(state.retry_count, 2);
    }

    #[test]
    fn test_attempt_history_caps_at_five() {
        let mut state = RetryState::new("s1", 100);
        for n in 0..9 {
            state.record_denial(attempt(n));
        }
        assert_eq!(state.previous_attempts.len(), MAX_ATTEMPT_HISTORY);
        // Oldest entries were evicted first.
        assert_eq!(state.previous_attempts[0].timestamp, 4);
        assert_eq!(state.previous_attempts[4].timestamp, 8);
    }

    #[test]
    fn test_exhaustion() {
        let mut state = RetryState::new("s1", 2);
        assert!(!state.is_exhausted());
        state.record_denial(attempt(1));
        assert!(!state.is_exhausted());
        state.record_denial(attempt(2));
        assert!(state.is_exhausted());
    }

    #[test]
    fn test_content_hash_is_stable_hex() {
        let a = content_hash("function f() {}");
        let b = content_hash("function f() {}");
        let c = content_hash("function g() {}");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileRetryStore::new(temp.path());

        assert!(store.load("s1").unwrap().is_none());

        let mut state = RetryState::new("s1", 3);
        state.record_denial(attempt(42));
        store.save(&state).unwrap();

        let loaded = store.load("s1").unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_file_store_save_replaces() {
        let temp = TempDir::new().unwrap();
        let store = FileRetryStore::new(temp.path());

        let mut state = RetryState::new("s1", 3);
        state.record_denial(attempt(1));
        store.save(&state).unwrap();
        state.record_denial(attempt(2));
        store.save(&state).unwrap();

        let loaded = store.load("s1").unwrap().unwrap();
        assert_eq!(loaded.retry_count, 2);
    }

    #[test]
    fn test_file_store_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = FileRetryStore::new(temp.path());

        let state = RetryState::new("s1", 3);
        store.save(&state).unwrap();
        store.delete("s1").unwrap();
        assert!(store.load("s1").unwrap().is_none());
        // Second delete of an absent record succeeds.
        store.delete("s1").unwrap();
    }

    #[test]
    fn test_session_ids_are_sanitized_for_filenames() {
        let temp = TempDir::new().unwrap();
        let store = FileRetryStore::new(temp.path());

        let state = RetryState::new("user/sess:1", 3);
        store.save(&state).unwrap();
        let loaded = store.load("user/sess:1").unwrap().unwrap();
        assert_eq!(loaded.session_id, "user/sess:1");
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryRetryStore::new();
        let state = RetryState::new("s1", 3);
        store.save(&state).unwrap();
        assert_eq!(store.load("s1").unwrap().unwrap(), state);
        store.delete("s1").unwrap();
        assert!(store.load("s1").unwrap().is_none());
    }
}
