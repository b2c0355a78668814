// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use auth_common::ErrorResponse;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Message returned for every authentication failure, whatever the cause.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid email or password";

/// Message for a missing, unknown or expired session cookie
pub const SESSION_MESSAGE: &str = "Invalid or expired session";

pub const DUPLICATE_EMAIL_MESSAGE: &str = "User with this email already exists";

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad credentials or a missing/expired session
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Authentication rate limit exceeded")]
    AuthRateLimited,

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::InvalidToken
            | AppError::AlreadyVerified => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AuthRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "AUTH_001",
            AppError::AuthRateLimited => "AUTH_003",
            AppError::Validation(_) => "VAL_001",
            AppError::BadRequest(_) => "VAL_002",
            AppError::InvalidToken => "TOKEN_001",
            AppError::AlreadyVerified => "TOKEN_002",
            AppError::Conflict(_) => "CONFLICT_001",
            AppError::NotFound(_) => "NF_001",
            AppError::Store(_) => "STORE_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a message that is safe to show to any caller
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(_) => "Unauthorized".to_string(),
            AppError::AuthRateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AppError::Validation(err) => err.to_string(),
            AppError::BadRequest(_) => "Invalid request format".to_string(),
            AppError::InvalidToken => "Invalid or expired token".to_string(),
            AppError::AlreadyVerified => "Email is already verified".to_string(),
            AppError::Conflict(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Store(_) => "Database error".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }

    /// Message carried in the response body.
    ///
    /// Authentication failures always carry their fixed public message.
    fn public_message(&self) -> String {
        match self {
            AppError::Auth(msg) => msg.clone(),
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::Conflict(_)
            | AppError::NotFound(_)
            | AppError::InvalidToken
            | AppError::AlreadyVerified
            | AppError::AuthRateLimited => self.sanitized_message(),
            AppError::Store(_) | AppError::Internal(_) => {
                if cfg!(debug_assertions) {
                    self.to_string()
                } else {
                    self.sanitized_message()
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }

        let body = ErrorResponse {
            error: self.public_message(),
            code: self.error_code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::Store(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {err}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
