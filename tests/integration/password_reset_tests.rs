// =======================================
// tests/integration/password_reset_tests.rs
// =======================================
//! Forgot-password and reset-password over HTTP
use axum::http::StatusCode;
use backend_lib::mailer::EmailKind;
use backend_lib::models::VerificationPurpose;
use serde_json::json;

use crate::test_utils::{spawn_app, spawn_app_with, test_settings, TestApp, TestResponse};

async fn forgot(app: &TestApp, email: &str) -> TestResponse {
    app.post_json("/api/auth/forgot-password", json!({ "email": email }), None)
        .await
}

async fn reset(app: &TestApp, token: &str, new_password: &str) -> TestResponse {
    app.post_json(
        "/api/auth/reset-password",
        json!({ "token": token, "newPassword": new_password }),
        None,
    )
    .await
}

#[tokio::test]
async fn test_full_reset_flow() {
    let app = spawn_app().await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;

    let requested = forgot(&app, "ana@x.com").await;
    assert_eq!(requested.status, StatusCode::OK);
    assert_eq!(
        requested.body["message"],
        "If the email exists, you will receive instructions to reset your password"
    );

    app.wait_for_mail(2).await;
    let token = app.latest_token("ana@x.com", EmailKind::PasswordReset).await;

    let done = reset(&app, &token, "newpass123").await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body["message"], "Password reset successfully");

    assert_eq!(
        app.sign_in("ana@x.com", "secret1").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(app.sign_in("ana@x.com", "newpass123").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_email_gets_the_same_answer() {
    let app = spawn_app().await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;
    app.wait_for_mail(1).await;

    let known = forgot(&app, "ana@x.com").await;
    let unknown = forgot(&app, "nobody@x.com").await;

    assert_eq!(known.status, unknown.status);
    assert_eq!(known.body, unknown.body);

    app.wait_for_mail(2).await;
    assert!(app
        .mailer
        .last_to("nobody@x.com", EmailKind::PasswordReset)
        .await
        .is_none());
}

#[tokio::test]
async fn test_forgot_password_rejects_malformed_email() {
    let app = spawn_app().await;
    let response = forgot(&app, "not-an-email").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_revokes_every_session() {
    let app = spawn_app().await;
    let first = app
        .sign_up("Ana", "ana@x.com", "secret1")
        .await
        .session_cookie()
        .unwrap();
    let second = app
        .sign_in("ana@x.com", "secret1")
        .await
        .session_cookie()
        .unwrap();

    forgot(&app, "ana@x.com").await;
    app.wait_for_mail(2).await;
    let token = app.latest_token("ana@x.com", EmailKind::PasswordReset).await;
    assert_eq!(reset(&app, &token, "newpass123").await.status, StatusCode::OK);

    assert_eq!(app.session(Some(&first)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.session(Some(&second)).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let app = spawn_app().await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;
    forgot(&app, "ana@x.com").await;
    app.wait_for_mail(2).await;
    let token = app.latest_token("ana@x.com", EmailKind::PasswordReset).await;

    assert_eq!(reset(&app, &token, "newpass123").await.status, StatusCode::OK);

    let reused = reset(&app, &token, "another123").await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);
    assert_eq!(reused.body["code"], "TOKEN_001");
    assert_eq!(app.sign_in("ana@x.com", "newpass123").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_newer_reset_token_supersedes_older() {
    let app = spawn_app().await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;

    forgot(&app, "ana@x.com").await;
    app.wait_for_mail(2).await;
    let older = app.latest_token("ana@x.com", EmailKind::PasswordReset).await;

    forgot(&app, "ana@x.com").await;
    app.wait_for_mail(3).await;
    let newer = app.latest_token("ana@x.com", EmailKind::PasswordReset).await;
    assert_ne!(older, newer);

    assert_eq!(
        app.store
            .verifications_for("ana@x.com", VerificationPurpose::PasswordReset)
            .await
            .len(),
        1
    );
    assert_eq!(reset(&app, &older, "newpass123").await.status, StatusCode::BAD_REQUEST);
    assert_eq!(reset(&app, &newer, "newpass123").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected() {
    let app = spawn_app().await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;

    let unknown = reset(&app, "no-such-token", "newpass123").await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

    let empty = reset(&app, "", "newpass123").await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.sign_in("ana@x.com", "secret1").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_verification_token_cannot_reset_password() {
    let app = spawn_app().await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;
    app.wait_for_mail(1).await;
    let verify_token = app.latest_token("ana@x.com", EmailKind::Verification).await;

    let response = reset(&app, &verify_token, "newpass123").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.sign_in("ana@x.com", "secret1").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_weak_new_password_keeps_token() {
    let app = spawn_app().await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;
    forgot(&app, "ana@x.com").await;
    app.wait_for_mail(2).await;
    let token = app.latest_token("ana@x.com", EmailKind::PasswordReset).await;

    let weak = reset(&app, &token, "abc").await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);
    assert_eq!(weak.body["code"], "VAL_001");

    assert_eq!(reset(&app, &token, "newpass123").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected() {
    let mut settings = test_settings();
    settings.verification.password_reset_ttl_secs = 0;
    let app = spawn_app_with(settings).await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;
    forgot(&app, "ana@x.com").await;
    app.wait_for_mail(2).await;
    let token = app.latest_token("ana@x.com", EmailKind::PasswordReset).await;

    let response = reset(&app, &token, "newpass123").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.sign_in("ana@x.com", "secret1").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_email_states_configured_expiry() {
    let mut settings = test_settings();
    settings.verification.password_reset_ttl_secs = 30 * 60;
    let app = spawn_app_with(settings).await;
    app.sign_up("Ana", "ana@x.com", "secret1").await;

    forgot(&app, "ana@x.com").await;
    app.wait_for_mail(2).await;
    let email = app
        .mailer
        .last_to("ana@x.com", EmailKind::PasswordReset)
        .await
        .unwrap();
    assert!(email.html.contains("expires in 30 minutes"));
}
