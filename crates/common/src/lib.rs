// ================
// crates/common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the web client and the auth server.
//! This module defines the JSON request and response bodies of the
//! `/api/auth/*` endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the session cookie.
///
/// Clients written against the previous deployment look this cookie up by
/// name, so it must never change.
pub const SESSION_COOKIE_NAME: &str = "better-auth.session_token";

/// Body of `POST /api/auth/sign-up`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignUpRequest {
    /// Display name
    pub name: String,
    /// Email address, used as the credential identifier
    pub email: String,
    /// Plaintext password (min 6 chars by default)
    pub password: String,
}

/// Body of `POST /api/auth/sign-in`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/forgot-password` and
/// `POST /api/auth/resend-verification`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EmailRequest {
    pub email: String,
}

/// Body of `POST /api/auth/reset-password`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Token delivered in the reset link
    pub token: String,
    /// Replacement password
    pub new_password: String,
}

/// Query string of `GET /api/auth/verify-email`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Public view of a user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    /// Opaque session token, also carried by the session cookie
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response of sign-up, sign-in and session lookup
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub user: UserInfo,
    pub session: SessionInfo,
}

/// Plain acknowledgement
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessageResponse {
    pub message: String,
    /// Set by endpoints whose clients check an explicit flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: Some(true),
        }
    }
}

/// Error body returned for every non-2xx response
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    /// Human readable message
    pub error: String,
    /// Stable machine readable code, e.g. `AUTH_001`
    pub code: String,
}
