//! Fixed-window admission control for a single client key.
//!
//! Windows are not aligned to wall-clock boundaries: the first request that
//! arrives after a window has expired starts the next one at its own arrival
//! time.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{NaasError, Result};

/// Default number of admissions per window.
pub const DEFAULT_PERMIT_LIMIT: u32 = 120;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of a single admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitDecision {
    Allowed,
    Rejected,
}

impl AdmitDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, AdmitDecision::Allowed)
    }
}

/// Limits applied to every client key. Immutable after construction.
///
/// There is no queue: once a window's permits are spent, further requests
/// are rejected immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    permit_limit: u32,
    window: Duration,
}

impl RateLimitPolicy {
    /// Build a policy, failing on a zero limit or an empty window.
    pub fn new(permit_limit: u32, window: Duration) -> Result<Self> {
        if permit_limit == 0 {
            return Err(NaasError::Configuration(
                "Permit limit must be greater than 0".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(NaasError::Configuration(
                "Window duration must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            permit_limit,
            window,
        })
    }

    pub fn permit_limit(&self) -> u32 {
        self.permit_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Short label for the window used in client-facing messages,
    /// e.g. `min` for a one minute window.
    pub fn window_label(&self) -> String {
        match self.window.as_secs() {
            1 if self.window.subsec_nanos() == 0 => "s".to_string(),
            60 if self.window.subsec_nanos() == 0 => "min".to_string(),
            3600 if self.window.subsec_nanos() == 0 => "h".to_string(),
            _ => humantime_serde::re::humantime::format_duration(self.window).to_string(),
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            permit_limit: DEFAULT_PERMIT_LIMIT,
            window: DEFAULT_WINDOW,
        }
    }
}

impl fmt::Display for RateLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} reqs/{}", self.permit_limit, self.window_label())
    }
}

/// Counter state for one client key.
///
/// `count` never exceeds the policy's permit limit and `window_start` never
/// moves backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimiterState {
    /// `None` until the first admit, which always opens a fresh window.
    window_start: Option<Instant>,
    count: u32,
}

impl LimiterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn window_start(&self) -> Option<Instant> {
        self.window_start
    }

    /// Whether the current window has run out at `now`.
    pub fn is_expired(&self, now: Instant, window: Duration) -> bool {
        match self.window_start {
            Some(start) => now.saturating_duration_since(start) >= window,
            None => true,
        }
    }

    /// Try to take one permit at `now`.
    ///
    /// Callers must hold exclusive access to the state for the whole call.
    pub fn admit(&mut self, now: Instant, policy: &RateLimitPolicy) -> AdmitDecision {
        if self.is_expired(now, policy.window) {
            // A stale `now` read before the lock was taken cannot pass the
            // expiry check, so the window only ever moves forward.
            self.window_start = Some(now);
            self.count = 0;
        }

        if self.count < policy.permit_limit {
            self.count += 1;
            AdmitDecision::Allowed
        } else {
            AdmitDecision::Rejected
        }
    }

    /// Time left until the current window closes.
    pub fn time_until_reset(&self, now: Instant, window: Duration) -> Duration {
        match self.window_start {
            Some(start) => window.saturating_sub(now.saturating_duration_since(start)),
            None => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_policy_rejects_zero_limit() {
        let result = RateLimitPolicy::new(0, secs(60));
        assert!(matches!(result, Err(NaasError::Configuration(_))));
    }

    #[test]
    fn test_policy_rejects_empty_window() {
        let result = RateLimitPolicy::new(10, Duration::ZERO);
        assert!(matches!(result, Err(NaasError::Configuration(_))));
    }

    #[test]
    fn test_default_policy() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.permit_limit(), 120);
        assert_eq!(policy.window(), secs(60));
        assert_eq!(policy.to_string(), "120 reqs/min");
    }

    #[test]
    fn test_window_label() {
        assert_eq!(RateLimitPolicy::new(1, secs(1)).unwrap().window_label(), "s");
        assert_eq!(RateLimitPolicy::new(1, secs(3600)).unwrap().window_label(), "h");
        assert_eq!(RateLimitPolicy::new(1, secs(30)).unwrap().window_label(), "30s");
    }

    #[test]
    fn test_permit_limit_requests_allowed() {
        let policy = RateLimitPolicy::new(5, secs(60)).unwrap();
        let mut state = LimiterState::new();
        let now = Instant::now();

        for _ in 0..5 {
            assert_eq!(state.admit(now, &policy), AdmitDecision::Allowed);
        }
        assert_eq!(state.count(), 5);

        assert_eq!(state.admit(now, &policy), AdmitDecision::Rejected);
        assert_eq!(state.count(), 5);
    }

    #[test]
    fn test_fixed_window_scenario() {
        let policy = RateLimitPolicy::new(3, secs(60)).unwrap();
        let mut state = LimiterState::new();
        let t0 = Instant::now();

        assert_eq!(state.admit(t0, &policy), AdmitDecision::Allowed);
        assert_eq!(state.admit(t0 + secs(10), &policy), AdmitDecision::Allowed);
        assert_eq!(state.admit(t0 + secs(20), &policy), AdmitDecision::Allowed);
        assert_eq!(state.admit(t0 + secs(30), &policy), AdmitDecision::Rejected);

        assert_eq!(state.admit(t0 + secs(61), &policy), AdmitDecision::Allowed);
        assert_eq!(state.count(), 1);
        assert_eq!(state.window_start(), Some(t0 + secs(61)));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let policy = RateLimitPolicy::new(1, secs(60)).unwrap();
        let mut state = LimiterState::new();
        let t0 = Instant::now();

        assert!(state.admit(t0, &policy).is_allowed());
        assert!(!state.admit(t0 + secs(59), &policy).is_allowed());
        assert!(state.admit(t0 + secs(60), &policy).is_allowed());
    }

    #[test]
    fn test_stale_timestamp_does_not_rewind_window() {
        let policy = RateLimitPolicy::new(2, secs(60)).unwrap();
        let mut state = LimiterState::new();
        let t0 = Instant::now();

        state.admit(t0 + secs(5), &policy);
        state.admit(t0, &policy);
        assert_eq!(state.window_start(), Some(t0 + secs(5)));
        assert_eq!(state.count(), 2);
    }

    #[test]
    fn test_time_until_reset() {
        let policy = RateLimitPolicy::new(2, secs(60)).unwrap();
        let mut state = LimiterState::new();
        let t0 = Instant::now();

        assert_eq!(state.time_until_reset(t0, policy.window()), Duration::ZERO);
        state.admit(t0, &policy);
        assert_eq!(state.time_until_reset(t0 + secs(15), policy.window()), secs(45));
        assert_eq!(state.time_until_reset(t0 + secs(90), policy.window()), Duration::ZERO);
    }
}
