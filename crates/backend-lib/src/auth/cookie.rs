// ============================
// crates/backend-lib/src/auth/cookie.rs
// ============================
//! Session cookie encoding.
use auth_common::SESSION_COOKIE_NAME;
use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::SessionSettings;

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, settings: &SessionSettings) -> Option<HeaderValue> {
    build(token, settings.ttl_secs, settings.cookie_secure)
}

/// `Set-Cookie` value that makes the client drop its session cookie
pub fn clear_cookie(settings: &SessionSettings) -> Option<HeaderValue> {
    build("", 0, settings.cookie_secure)
}

fn build(value: &str, max_age: u64, secure: bool) -> Option<HeaderValue> {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// Session token sent by the client, if any
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
