//! Request Rate Limiting and Login Lockout
//!
//! Two independent in-memory mechanisms:
//! - Fixed-window request counters keyed by an identifier (client IP + route)
//! - Failed-login counters keyed by account, locking the account once the
//!   configured maximum is reached
//!
//! Expiry is lazy: elapsed windows are replaced on next access, and an elapsed
//! lockout stops blocking but keeps its failure count, so the next failure
//! locks the account again. Only a successful login forgets an account's
//! failures. Call [`RateLimiter::sweep_expired`] periodically to reclaim
//! memory held by identifiers that never come back.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kernel::clock::SharedClock;
use platform::rate_limit::{
    RateLimitConfig, RateLimitResult, RateLimitStore, RateLimitStoreError,
};
use serde::Serialize;

use crate::config::LoginAttemptConfig;

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    reset_at_ms: i64,
}

#[derive(Debug, Clone, Copy)]
struct LoginAttempts {
    failures: u32,
    lockout_until_ms: Option<i64>,
    last_failure_ms: i64,
}

impl LoginAttempts {
    fn is_locked(&self, now_ms: i64) -> bool {
        self.lockout_until_ms.is_some_and(|until| now_ms < until)
    }

    /// Unlocked and untouched for `idle_ms` since the last failure or lockout end
    fn is_stale(&self, now_ms: i64, idle_ms: i64) -> bool {
        let last_activity = self
            .lockout_until_ms
            .map_or(self.last_failure_ms, |until| until.max(self.last_failure_ms));
        !self.is_locked(now_ms) && now_ms.saturating_sub(last_activity) >= idle_ms
    }
}

/// Result of a login-attempt check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginAttemptStatus {
    pub allowed: bool,
    pub remaining_attempts: u32,
    /// Set while the account is locked
    pub lockout_until_ms: Option<i64>,
}

/// In-memory rate limiter
pub struct RateLimiter {
    config: RateLimitConfig,
    login: LoginAttemptConfig,
    windows: Mutex<HashMap<String, RateWindow>>,
    attempts: Mutex<HashMap<String, LoginAttempts>>,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, login: LoginAttemptConfig, clock: SharedClock) -> Self {
        Self {
            config,
            login,
            windows: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request against `identifier` using the default window
    pub fn check_rate_limit(&self, identifier: &str) -> RateLimitResult {
        self.check_rate_limit_with(identifier, &self.config)
    }

    /// Count one request against `identifier` using a route-specific window
    ///
    /// Callers using different configs must use distinct identifiers.
    pub fn check_rate_limit_with(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult {
        let now = self.clock.now_ms();
        let mut windows = lock(&self.windows);

        let window = windows
            .entry(identifier.to_string())
            .and_modify(|w| {
                if now > w.reset_at_ms {
                    *w = RateWindow {
                        count: 0,
                        reset_at_ms: now.saturating_add(config.window_ms()),
                    };
                }
            })
            .or_insert(RateWindow {
                count: 0,
                reset_at_ms: now.saturating_add(config.window_ms()),
            });

        window.count = window.count.saturating_add(1);

        if window.count > config.max_requests {
            tracing::debug!(identifier = %identifier, count = window.count, "Rate limit exceeded");
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_at_ms: window.reset_at_ms,
            };
        }

        RateLimitResult {
            allowed: true,
            remaining: config.max_requests - window.count,
            reset_at_ms: window.reset_at_ms,
        }
    }

    /// Whether `account` may attempt to log in right now
    pub fn check_login_attempts(&self, account: &str) -> LoginAttemptStatus {
        let now = self.clock.now_ms();
        let max = self.login.max_attempts;
        let attempts = lock(&self.attempts);

        match attempts.get(account) {
            Some(record) if record.is_locked(now) => LoginAttemptStatus {
                allowed: false,
                remaining_attempts: 0,
                lockout_until_ms: record.lockout_until_ms,
            },
            Some(record) => LoginAttemptStatus {
                allowed: true,
                remaining_attempts: max.saturating_sub(record.failures),
                lockout_until_ms: None,
            },
            None => LoginAttemptStatus {
                allowed: true,
                remaining_attempts: max,
                lockout_until_ms: None,
            },
        }
    }

    /// Record a login outcome; success forgets all prior failures
    pub fn record_login_attempt(&self, account: &str, success: bool) {
        let mut attempts = lock(&self.attempts);

        if success {
            attempts.remove(account);
            return;
        }

        let now = self.clock.now_ms();
        self.count_failure(&mut attempts, account, now);
    }

    /// Check the lockout and count a failure in one step, before the
    /// credentials are verified
    ///
    /// Concurrent attempts for the same account cannot all slip past the
    /// lockout. A verified attempt must then call
    /// `record_login_attempt(account, true)` to forget the failures; a
    /// rejected one needs no further call.
    pub fn reserve_login_attempt(&self, account: &str) -> LoginAttemptStatus {
        let now = self.clock.now_ms();
        let mut attempts = lock(&self.attempts);

        if let Some(record) = attempts.get(account).filter(|r| r.is_locked(now)) {
            return LoginAttemptStatus {
                allowed: false,
                remaining_attempts: 0,
                lockout_until_ms: record.lockout_until_ms,
            };
        }

        let failures = self.count_failure(&mut attempts, account, now);
        LoginAttemptStatus {
            allowed: true,
            remaining_attempts: self.login.max_attempts.saturating_sub(failures),
            lockout_until_ms: None,
        }
    }

    fn count_failure(
        &self,
        attempts: &mut HashMap<String, LoginAttempts>,
        account: &str,
        now: i64,
    ) -> u32 {
        let record = attempts.entry(account.to_string()).or_insert(LoginAttempts {
            failures: 0,
            lockout_until_ms: None,
            last_failure_ms: now,
        });
        record.failures = record.failures.saturating_add(1);
        record.last_failure_ms = now;

        if record.failures >= self.login.max_attempts {
            let until = now.saturating_add(self.login.lockout_ms());
            record.lockout_until_ms = Some(until);
            tracing::warn!(
                account = %account,
                failures = record.failures,
                lockout_until_ms = until,
                "Account locked after repeated login failures"
            );
        }
        record.failures
    }

    /// Drop elapsed windows and idle login records; returns how many were removed
    ///
    /// A login record is idle once it is unlocked and nothing has touched it
    /// for one lockout duration since its last failure or lockout end.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();

        let mut windows = lock(&self.windows);
        let before = windows.len();
        windows.retain(|_, w| now <= w.reset_at_ms);
        let mut removed = before - windows.len();
        drop(windows);

        let mut attempts = lock(&self.attempts);
        let before = attempts.len();
        let idle_ms = self.login.lockout_ms();
        attempts.retain(|_, r| !r.is_stale(now, idle_ms));
        removed += before - attempts.len();

        removed
    }

    /// Number of tracked request windows
    pub fn tracked_identifiers(&self) -> usize {
        lock(&self.windows).len()
    }
}

impl RateLimitStore for RateLimiter {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitStoreError> {
        Ok(self.check_rate_limit_with(key, config))
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::clock::{Clock, ManualClock};
    use std::sync::Arc;
    use std::time::Duration;

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let limiter = RateLimiter::new(
            RateLimitConfig::default(),
            LoginAttemptConfig::default(),
            clock.clone(),
        );
        (limiter, clock)
    }

    #[test]
    fn test_fixed_window() {
        let (limiter, clock) = limiter();

        for i in 1..=30 {
            let result = limiter.check_rate_limit("10.0.0.1:/sign-in");
            assert!(result.allowed, "call {} should be allowed", i);
            assert_eq!(result.remaining, 30 - i);
        }

        let blocked = limiter.check_rate_limit("10.0.0.1:/sign-in");
        assert!(!blocked.allowed);
        assert_eq!(blocked.remaining, 0);
        assert_eq!(blocked.reset_at_ms, clock.now_ms() + 60_000);

        clock.advance(Duration::from_millis(60_001));
        let fresh = limiter.check_rate_limit("10.0.0.1:/sign-in");
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 29);
        assert_eq!(fresh.reset_at_ms, clock.now_ms() + 60_000);
    }

    #[test]
    fn test_window_does_not_reset_early() {
        let (limiter, clock) = limiter();
        for _ in 0..31 {
            limiter.check_rate_limit("id");
        }

        // reset happens only strictly after reset_at
        clock.advance(Duration::from_secs(60));
        assert!(!limiter.check_rate_limit("id").allowed);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (limiter, _) = limiter();
        let config = RateLimitConfig::new(1, 60);

        assert!(limiter.check_rate_limit_with("a", &config).allowed);
        assert!(!limiter.check_rate_limit_with("a", &config).allowed);
        assert!(limiter.check_rate_limit_with("b", &config).allowed);
    }

    #[test]
    fn test_lockout_after_max_failures() {
        let (limiter, clock) = limiter();
        let email = "user@example.com";

        for remaining in (1..=5).rev() {
            let status = limiter.check_login_attempts(email);
            assert!(status.allowed);
            assert_eq!(status.remaining_attempts, remaining);
            limiter.record_login_attempt(email, false);
        }

        let status = limiter.check_login_attempts(email);
        assert!(!status.allowed);
        assert_eq!(status.remaining_attempts, 0);
        assert_eq!(status.lockout_until_ms, Some(clock.now_ms() + 15 * 60 * 1000));

        limiter.record_login_attempt(email, true);
        let status = limiter.check_login_attempts(email);
        assert!(status.allowed);
        assert_eq!(status.remaining_attempts, 5);
        assert_eq!(status.lockout_until_ms, None);
    }

    #[test]
    fn test_lockout_expiry_keeps_failure_count() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            limiter.record_login_attempt("acct", false);
        }
        assert!(!limiter.check_login_attempts("acct").allowed);

        clock.advance(Duration::from_secs(15 * 60));
        let status = limiter.check_login_attempts("acct");
        assert!(status.allowed);
        assert_eq!(status.remaining_attempts, 0);
        assert_eq!(status.lockout_until_ms, None);

        // one more failure locks again straight away
        limiter.record_login_attempt("acct", false);
        let status = limiter.check_login_attempts("acct");
        assert!(!status.allowed);
        assert_eq!(status.lockout_until_ms, Some(clock.now_ms() + 15 * 60 * 1000));

        clock.advance(Duration::from_secs(15 * 60));
        limiter.record_login_attempt("acct", true);
        assert_eq!(limiter.check_login_attempts("acct").remaining_attempts, 5);
    }

    #[test]
    fn test_reserve_counts_attempt_before_verification() {
        let (limiter, _) = limiter();

        for remaining in (0..5).rev() {
            let status = limiter.reserve_login_attempt("acct");
            assert!(status.allowed);
            assert_eq!(status.remaining_attempts, remaining);
        }

        let status = limiter.reserve_login_attempt("acct");
        assert!(!status.allowed);
        assert!(status.lockout_until_ms.is_some());
    }

    #[test]
    fn test_reserve_then_success_forgets_failures() {
        let (limiter, _) = limiter();
        limiter.record_login_attempt("acct", false);
        limiter.record_login_attempt("acct", false);

        assert_eq!(limiter.reserve_login_attempt("acct").remaining_attempts, 2);
        limiter.record_login_attempt("acct", true);

        let status = limiter.check_login_attempts("acct");
        assert!(status.allowed);
        assert_eq!(status.remaining_attempts, 5);
    }

    #[test]
    fn test_concurrent_reservations_respect_lockout() {
        let (limiter, _) = limiter();
        let limiter = Arc::new(limiter);

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.reserve_login_attempt("acct").allowed)
            })
            .collect();
        let allowed = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(allowed, 5);
        assert!(!limiter.check_login_attempts("acct").allowed);
    }

    #[test]
    fn test_login_lockout_is_per_account() {
        let (limiter, _) = limiter();
        for _ in 0..5 {
            limiter.record_login_attempt("a@x.io", false);
        }
        assert!(!limiter.check_login_attempts("a@x.io").allowed);
        assert!(limiter.check_login_attempts("b@x.io").allowed);
        // request windows are unaffected by lockout
        assert!(limiter.check_rate_limit("a@x.io").allowed);
    }

    #[test]
    fn test_sweep_expired() {
        let (limiter, clock) = limiter();
        limiter.check_rate_limit("one");
        limiter.check_rate_limit("two");
        for _ in 0..5 {
            limiter.record_login_attempt("acct", false);
        }
        limiter.record_login_attempt("pending", false);

        assert_eq!(limiter.sweep_expired(), 0);

        clock.advance(Duration::from_secs(15 * 60));
        // two windows plus the idle unlocked record; the lockout just ended
        assert_eq!(limiter.sweep_expired(), 3);
        assert_eq!(limiter.tracked_identifiers(), 0);
        assert_eq!(limiter.check_login_attempts("pending").remaining_attempts, 5);
        assert_eq!(limiter.check_login_attempts("acct").remaining_attempts, 0);

        clock.advance(Duration::from_secs(15 * 60));
        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.check_login_attempts("acct").remaining_attempts, 5);
    }

    #[test]
    fn test_sweep_reclaims_failures_for_unknown_accounts() {
        let (limiter, clock) = limiter();
        for i in 0..100 {
            limiter.record_login_attempt(&format!("random-{i}@x.io"), false);
        }

        clock.advance(Duration::from_secs(15 * 60 - 1));
        assert_eq!(limiter.sweep_expired(), 0);

        clock.advance_ms(1_000);
        assert_eq!(limiter.sweep_expired(), 100);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let (limiter, _) = limiter();
        let limiter = Arc::new(limiter);
        let config = RateLimitConfig::new(1000, 60);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                let config = config.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        limiter.check_rate_limit_with("shared", &config);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let result = limiter.check_rate_limit_with("shared", &config);
        assert_eq!(result.remaining, 1000 - 401);
    }

    #[tokio::test]
    async fn test_rate_limit_store_seam() {
        let (limiter, _) = limiter();
        let config = RateLimitConfig::new(2, 60);

        let first = limiter.check_and_increment("k", &config).await.unwrap();
        let second = limiter.check_and_increment("k", &config).await.unwrap();
        let third = limiter.check_and_increment("k", &config).await.unwrap();

        assert_eq!(first.remaining, 1);
        assert_eq!(second.remaining, 0);
        assert!(second.allowed);
        assert!(!third.allowed);
    }
}
