// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! Sign-in lockout behaviour of `AuthRateLimiter`
use backend_lib::auth::AuthRateLimiter;
use backend_lib::config::RateLimitSettings;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(198, 51, 100, last))
}

#[test]
fn test_fresh_client_is_allowed() {
    let limiter = AuthRateLimiter::default();
    assert!(limiter.check_rate_limit(ip(1)));
}

#[test]
fn test_default_threshold_is_five_failures() {
    let limiter = AuthRateLimiter::default();

    for _ in 0..4 {
        limiter.record_failed_attempt(ip(2));
    }
    assert!(limiter.check_rate_limit(ip(2)));

    limiter.record_failed_attempt(ip(2));
    assert!(!limiter.check_rate_limit(ip(2)));
}

#[test]
fn test_success_resets_the_count() {
    let limiter = AuthRateLimiter::default();

    for _ in 0..3 {
        limiter.record_failed_attempt(ip(3));
    }
    limiter.record_success(ip(3));

    // a full window of failures is needed again
    for _ in 0..4 {
        limiter.record_failed_attempt(ip(3));
    }
    assert!(limiter.check_rate_limit(ip(3)));
}

#[test]
fn test_clients_are_tracked_separately() {
    let limiter = AuthRateLimiter::new(2, Duration::from_secs(60));

    limiter.record_failed_attempt(ip(4));
    limiter.record_failed_attempt(ip(4));

    assert!(!limiter.check_rate_limit(ip(4)));
    assert!(limiter.check_rate_limit(ip(5)));
}

#[test]
fn test_settings_drive_threshold() {
    let limiter = AuthRateLimiter::from_settings(&RateLimitSettings {
        max_failed_attempts: 1,
        lockout_secs: 60,
    });
    limiter.record_failed_attempt(ip(6));
    assert!(!limiter.check_rate_limit(ip(6)));
}

#[test]
fn test_cleanup_keeps_active_lockouts() {
    let limiter = AuthRateLimiter::new(1, Duration::from_secs(60));
    limiter.record_failed_attempt(ip(7));
    limiter.record_failed_attempt(ip(8));
    limiter.record_success(ip(8));

    limiter.cleanup();
    assert_eq!(limiter.tracked(), 1);
    assert!(!limiter.check_rate_limit(ip(7)));
}
