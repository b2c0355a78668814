// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request validation.

use crate::config::PasswordSettings;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_TOKEN_LENGTH: usize = 512;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^<>{}\[\];]*$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Canonical form of an email address: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate and normalize an email address
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = normalize_email(email);

    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email must not be empty".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email must not exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(&email) {
        return Err(ValidationError::InvalidEmail(
            "Email format is invalid".to_string(),
        ));
    }

    Ok(email)
}

/// Validate a display name, returning it trimmed
pub fn validate_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::InvalidName(
            "Name must not be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName(format!(
            "Name must not exceed {MAX_NAME_LENGTH} characters"
        )));
    }

    if !NAME_REGEX.is_match(name) {
        return Err(ValidationError::InvalidName(
            "Name contains invalid characters".to_string(),
        ));
    }

    Ok(name.to_string())
}

/// Validate a new password against the configured policy
pub fn validate_password<'a>(
    password: &'a str,
    policy: &PasswordSettings,
) -> ValidationResult<&'a str> {
    let length = password.chars().count();

    if length < policy.min_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {} characters",
            policy.min_length
        )));
    }

    if length > policy.max_length {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must not exceed {} characters",
            policy.max_length
        )));
    }

    if policy.require_uppercase && !password.chars().any(char::is_uppercase) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain an uppercase letter".to_string(),
        ));
    }

    if policy.require_lowercase && !password.chars().any(char::is_lowercase) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain a lowercase letter".to_string(),
        ));
    }

    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain a digit".to_string(),
        ));
    }

    if policy.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(ValidationError::InvalidPassword(
            "Password must contain a special character".to_string(),
        ));
    }

    Ok(password)
}

/// Validate that a password was supplied at all (sign-in only checks presence)
pub fn validate_password_present(password: &str) -> ValidationResult<&str> {
    if password.is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password is required".to_string(),
        ));
    }
    Ok(password)
}

/// Validate an opaque token taken from a link or request body
pub fn validate_token(token: &str) -> ValidationResult<&str> {
    let token = token.trim();

    if token.is_empty() {
        return Err(ValidationError::InvalidToken(
            "Token is required".to_string(),
        ));
    }

    if token.len() > MAX_TOKEN_LENGTH {
        return Err(ValidationError::InvalidToken(
            "Token is too long".to_string(),
        ));
    }

    Ok(token)
}
