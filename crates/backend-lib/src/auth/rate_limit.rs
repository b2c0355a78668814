// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Sign-in lockout after repeated failures from one address.

use dashmap::DashMap;
use metrics::counter;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RateLimitSettings;
use crate::metrics::SIGN_IN_LOCKED_OUT;

/// Entries without a failure for this long are dropped by `cleanup`
const ENTRY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Tracked addresses above which a failure triggers `cleanup`
const CLEANUP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone)]
struct FailureEntry {
    failed_attempts: u32,
    last_failure: Instant,
    /// Set once the address crossed the threshold
    locked_until: Option<Instant>,
}

/// Tracks failed sign-ins per client address
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<IpAddr, FailureEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.max_failed_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    /// Record a failed sign-in
    pub fn record_failed_attempt(&self, ip: IpAddr) {
        if self.attempts.len() > CLEANUP_THRESHOLD {
            self.cleanup();
        }
        let now = Instant::now();

        let mut entry = self.attempts.entry(ip).or_insert_with(|| FailureEntry {
            failed_attempts: 0,
            last_failure: now,
            locked_until: None,
        });

        // a lapsed lockout starts a fresh window
        if entry.locked_until.is_some_and(|until| now >= until) {
            entry.failed_attempts = 0;
            entry.locked_until = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.locked_until.is_none() {
            entry.locked_until = Some(now + self.lockout_duration);
            counter!(SIGN_IN_LOCKED_OUT).increment(1);
            tracing::warn!(
                %ip,
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "client locked out of sign-in"
            );
        }
    }

    /// Successful sign-in clears the record
    pub fn record_success(&self, ip: IpAddr) {
        self.attempts.remove(&ip);
    }

    /// Whether `ip` may attempt to sign in now
    pub fn check_rate_limit(&self, ip: IpAddr) -> bool {
        match self.attempts.get(&ip) {
            Some(entry) => entry
                .locked_until
                .map_or(true, |until| Instant::now() >= until),
            None => true,
        }
    }

    /// Drop lapsed lockouts and stale failure records
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| match entry.locked_until {
            Some(until) => now < until,
            None => now.duration_since(entry.last_failure) < ENTRY_RETENTION,
        });
    }

    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}
