// =========================
// tests/unit/error_tests.rs
// =========================
//! Unit tests for the error module
use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use backend_lib::error::{AppError, UNAUTHORIZED_MESSAGE};
use backend_lib::storage::StoreError;
use backend_lib::validation::ValidationError;
use serde_json::Value;

async fn body_of(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_app_error_display() {
    let auth_error = AppError::Auth("Invalid token".to_string());
    assert_eq!(auth_error.to_string(), "Authentication error: Invalid token");
    assert_eq!(AppError::InvalidToken.to_string(), "Invalid or expired token");
}

#[test]
fn test_app_error_error_codes() {
    assert_eq!(AppError::Auth(UNAUTHORIZED_MESSAGE.into()).error_code(), "AUTH_001");
    assert_eq!(AppError::AuthRateLimited.error_code(), "AUTH_003");
    assert_eq!(AppError::InvalidToken.error_code(), "TOKEN_001");
    assert_eq!(AppError::AlreadyVerified.error_code(), "TOKEN_002");
    assert_eq!(AppError::Internal("x".into()).error_code(), "INT_001");
}

#[tokio::test]
async fn test_auth_error_body_is_fixed() {
    let (status, body) = body_of(AppError::Auth(UNAUTHORIZED_MESSAGE.to_string())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], UNAUTHORIZED_MESSAGE);
    assert_eq!(body["code"], "AUTH_001");
}

#[tokio::test]
async fn test_validation_error_body() {
    let err: AppError = ValidationError::InvalidEmail("Invalid email format".into()).into();
    let (status, body) = body_of(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VAL_001");
    assert!(body["error"].as_str().unwrap().contains("Invalid email"));
}

#[test]
fn test_store_conflict_becomes_409() {
    let err: AppError = StoreError::Conflict("User with this email already exists".into()).into();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);

    let err: AppError = StoreError::Unavailable("down".into()).into();
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.sanitized_message(), "Database error");
}
