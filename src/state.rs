//! Outstanding Login Attempt Store
//!
//! Tracks the state -> PKCE verifier mapping for logins that have been
//! started but not yet completed. The state parameter is the CSRF token
//! echoed back by the provider; it is strictly single use.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::pkce;

/// How long an abandoned login attempt stays resolvable.
const ATTEMPT_TTL_SECONDS: i64 = 600;

#[derive(Debug, Clone)]
struct LoginAttempt {
    verifier: String,
    created_at: DateTime<Utc>,
}

/// In-memory store of outstanding login attempts.
///
/// An explicit-lifetime value injected into the coordinator, not a
/// package-level singleton. All read-modify-write sequences run under a
/// single lock, so two concurrent resolves of the same state cannot both
/// succeed.
pub struct StateStore {
    attempts: Mutex<HashMap<String, LoginAttempt>>,
    ttl: Duration,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ATTEMPT_TTL_SECONDS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Generate a fresh (state, verifier) pair and register the attempt.
    ///
    /// State uniqueness among outstanding attempts is enforced inside the
    /// critical section by regenerating on collision. Fails only if the OS
    /// entropy source fails, which callers should treat as fatal.
    pub fn create(&self) -> Result<(String, String)> {
        let verifier = pkce::generate_verifier()?;
        let now = Utc::now();

        let mut attempts = self.attempts.lock();
        attempts.retain(|_, attempt| now - attempt.created_at < self.ttl);

        loop {
            let state = pkce::random_token()?;
            if attempts.contains_key(&state) {
                continue;
            }
            attempts.insert(
                state.clone(),
                LoginAttempt {
                    verifier: verifier.clone(),
                    created_at: now,
                },
            );
            debug!(outstanding = attempts.len(), "registered login attempt");
            return Ok((state, verifier));
        }
    }

    /// Atomically look up and delete the attempt for `state`.
    ///
    /// Returns `None` for states that were never issued, already consumed,
    /// or expired. The three cases are indistinguishable so a caller (or an
    /// attacker) cannot learn which one applied.
    pub fn resolve(&self, state: &str) -> Option<String> {
        let mut attempts = self.attempts.lock();
        let attempt = attempts.remove(state)?;
        if Utc::now() - attempt.created_at >= self.ttl {
            return None;
        }
        Some(attempt.verifier)
    }

    /// Drop attempts older than the TTL. `create` also sweeps lazily, so
    /// abandoned logins cannot grow the map without bound even if this is
    /// never called.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let mut attempts = self.attempts.lock();
        let before = attempts.len();
        attempts.retain(|_, attempt| now - attempt.created_at < self.ttl);
        let swept = before - attempts.len();
        if swept > 0 {
            debug!(swept, outstanding = attempts.len(), "swept expired login attempts");
        }
    }

    /// Number of outstanding attempts.
    pub fn outstanding(&self) -> usize {
        self.attempts.lock().len()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_create_then_resolve() {
        let store = StateStore::new();
        let (state, verifier) = store.create().unwrap();

        assert_eq!(store.resolve(&state), Some(verifier));
    }

    #[test]
    fn test_resolve_is_single_use() {
        let store = StateStore::new();
        let (state, _) = store.create().unwrap();

        assert!(store.resolve(&state).is_some());
        assert_eq!(store.resolve(&state), None);
    }

    #[test]
    fn test_resolve_unknown_state() {
        let store = StateStore::new();
        assert_eq!(store.resolve("never-issued"), None);
    }

    #[test]
    fn test_expired_attempt_not_resolvable() {
        let store = StateStore::new().with_ttl(Duration::zero());
        let (state, _) = store.create().unwrap();

        assert_eq!(store.resolve(&state), None);
    }

    #[test]
    fn test_sweep_removes_expired() {
        let store = StateStore::new().with_ttl(Duration::seconds(1));
        store.create().unwrap();
        assert_eq!(store.outstanding(), 1);

        store.sweep(Utc::now() + Duration::seconds(5));
        assert_eq!(store.outstanding(), 0);
    }

    #[test]
    fn test_states_unique_under_concurrent_creates() {
        let store = Arc::new(StateStore::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                (0..125)
                    .map(|_| store.create().unwrap().0)
                    .collect::<Vec<_>>()
            }));
        }

        let mut states = HashSet::new();
        for handle in handles {
            for state in handle.join().unwrap() {
                assert!(states.insert(state), "duplicate state issued");
            }
        }
        assert_eq!(states.len(), 1000);
        assert_eq!(store.outstanding(), 1000);
    }
}
