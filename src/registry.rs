//! Per-key limiter state storage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::rate_limiter::{AdmitDecision, LimiterState, RateLimitPolicy};

/// Shared handle to one key's limiter state.
pub type SharedLimiterState = Arc<Mutex<LimiterState>>;

/// Owns one [`LimiterState`] per client key.
///
/// Entries are created lazily on first sight of a key. Nothing removes them
/// unless [`LimiterRegistry::sweep_expired`] is called, so memory grows with
/// the number of distinct keys observed.
///
/// The map is sharded, so inserting a new key only locks one shard, and each
/// key's state sits behind its own mutex: admits for different keys never
/// contend on a common lock.
#[derive(Debug, Default)]
pub struct LimiterRegistry {
    states: DashMap<String, SharedLimiterState>,
}

impl LimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the state for `key`, inserting a fresh one if absent.
    ///
    /// Concurrent callers racing on an unseen key all receive the same
    /// instance.
    pub fn get_or_create(&self, key: &str) -> SharedLimiterState {
        if let Some(state) = self.states.get(key) {
            return Arc::clone(state.value());
        }

        let state = self.states.entry(key.to_string()).or_insert_with(|| {
            debug!(key = %key, "Creating limiter state");
            Arc::new(Mutex::new(LimiterState::new()))
        });
        Arc::clone(state.value())
    }

    /// Charge one request for `key` against `policy` at time `now`.
    pub fn admit(&self, key: &str, now: Instant, policy: &RateLimitPolicy) -> AdmitDecision {
        let state = self.get_or_create(key);
        let decision = state.lock().admit(now, policy);
        trace!(key = %key, decision = ?decision, "Admit");
        decision
    }

    /// Current count for `key`, if the key has been seen.
    pub fn count(&self, key: &str) -> Option<u32> {
        self.states.get(key).map(|state| state.value().lock().count())
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop entries whose window has expired at `now`.
    ///
    /// An expired entry would be reset on its next admit anyway, so removing
    /// it does not change any decision. Entries currently held by an
    /// in-flight admit are kept: the shard write lock taken by `retain`
    /// stops new handles from being cloned, and a strong count of one means
    /// no handle is outstanding.
    pub fn sweep_expired(&self, now: Instant, window: Duration) -> usize {
        let before = self.states.len();
        self.states.retain(|_, state| {
            if Arc::strong_count(state) > 1 {
                return true;
            }
            !state.lock().is_expired(now, window)
        });
        let removed = before.saturating_sub(self.states.len());
        if removed > 0 {
            debug!(removed, remaining = self.states.len(), "Swept expired limiter states");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(limit: u32) -> RateLimitPolicy {
        RateLimitPolicy::new(limit, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_registry_creation() {
        let registry = LimiterRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.count("1.2.3.4"), None);
    }

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let registry = LimiterRegistry::new();

        let first = registry.get_or_create("1.2.3.4");
        let second = registry.get_or_create("1.2.3.4");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(first.lock().count(), 0);
    }

    #[test]
    fn test_distinct_keys_do_not_interact() {
        let registry = LimiterRegistry::new();
        let policy = policy(2);
        let now = Instant::now();

        assert!(registry.admit("a", now, &policy).is_allowed());
        assert!(registry.admit("a", now, &policy).is_allowed());
        assert!(!registry.admit("a", now, &policy).is_allowed());

        assert!(registry.admit("b", now, &policy).is_allowed());
        assert_eq!(registry.count("a"), Some(2));
        assert_eq!(registry.count("b"), Some(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let registry = LimiterRegistry::new();
        let policy = policy(5);
        let t0 = Instant::now();
        let window = policy.window();

        registry.admit("old", t0, &policy);
        registry.admit("fresh", t0 + Duration::from_secs(50), &policy);

        let removed = registry.sweep_expired(t0 + Duration::from_secs(70), window);
        assert_eq!(removed, 1);
        assert_eq!(registry.count("old"), None);
        assert_eq!(registry.count("fresh"), Some(1));
    }

    #[test]
    fn test_sweep_keeps_entries_in_use() {
        let registry = LimiterRegistry::new();
        let policy = policy(5);
        let t0 = Instant::now();

        registry.admit("held", t0, &policy);
        let handle = registry.get_or_create("held");

        let removed = registry.sweep_expired(t0 + Duration::from_secs(120), policy.window());
        assert_eq!(removed, 0);
        assert!(Arc::ptr_eq(&handle, &registry.get_or_create("held")));
    }
}
