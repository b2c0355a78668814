// ==========================
// tests/unit/config_tests.rs
// ==========================
//! Unit tests for the configuration module
use backend_lib::config::{HashAlgorithm, LogFormat, MailProvider, Settings};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_settings_default() {
    let settings = Settings::default();

    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 3000);
    assert_eq!(settings.app.base_url, "http://localhost:5173");
    assert_eq!(settings.session.ttl_secs, 30 * 24 * 60 * 60);
    assert!(!settings.session.cookie_secure);
    assert_eq!(settings.password.algorithm, HashAlgorithm::Scrypt);
    assert_eq!(settings.mail.provider, MailProvider::Log);
    assert_eq!(settings.log.format, LogFormat::Text);
}

#[test]
fn test_load_config_from_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("auth.toml");

    fs::write(
        &config_path,
        r#"
        [session]
        ttl_secs = 3600
        cookie_secure = true

        [password]
        algorithm = "argon2"
        min_length = 8

        [mail]
        from = "Auth <auth@example.com>"
        max_attempts = 5

        [log]
        format = "json"
        "#,
    )
    .unwrap();

    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(settings.session.ttl_secs, 3600);
    assert!(settings.session.cookie_secure);
    assert_eq!(settings.password.algorithm, HashAlgorithm::Argon2);
    assert_eq!(settings.password.min_length, 8);
    assert_eq!(settings.mail.from, "Auth <auth@example.com>");
    assert_eq!(settings.mail.max_attempts, 5);
    assert_eq!(settings.log.format, LogFormat::Json);
    // untouched sections keep their defaults
    assert_eq!(settings.verification.password_reset_ttl_secs, 3600);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let temp_dir = tempdir().unwrap();
    assert!(Settings::load_from(temp_dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("auth.toml");
    fs::write(
        &config_path,
        r#"
        [mail]
        provider = "resend"
        resend_api_key = ""
        "#,
    )
    .unwrap();

    assert!(Settings::load_from(&config_path).is_err());
}

#[test]
fn test_ttl_upper_bound() {
    let mut settings = Settings::default();
    settings.verification.email_ttl_secs = u64::MAX;
    assert!(settings.validate().is_err());
}
