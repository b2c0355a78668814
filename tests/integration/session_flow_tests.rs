// =====================================
// tests/integration/session_flow_tests.rs
// =====================================
//! Session lookup and sign-out over HTTP
use axum::http::StatusCode;
use serde_json::json;

use crate::test_utils::spawn_app;

#[tokio::test]
async fn test_missing_cookie_is_unauthorized() {
    let app = spawn_app().await;
    let response = app.session(None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["code"], "AUTH_001");
}

#[tokio::test]
async fn test_unknown_token_matches_missing_cookie() {
    let app = spawn_app().await;
    let missing = app.session(None).await;
    let unknown = app.session(Some("forged-token")).await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body, unknown.body);
}

#[tokio::test]
async fn test_sign_out_revokes_session() {
    let app = spawn_app().await;
    let token = app
        .sign_up("Ana", "ana@x.com", "secret1")
        .await
        .session_cookie()
        .unwrap();

    let signed_out = app
        .post_json("/api/auth/sign-out", json!({}), Some(&token))
        .await;
    assert_eq!(signed_out.status, StatusCode::OK);
    assert_eq!(signed_out.body["message"], "Signed out successfully");

    let cleared = signed_out.set_cookie_header().unwrap();
    assert!(cleared.starts_with("better-auth.session_token=;"));
    assert!(cleared.contains("Max-Age=0"));

    let after = app.session(Some(&token)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.session_count().await, 0);
}

#[tokio::test]
async fn test_sign_out_is_idempotent() {
    let app = spawn_app().await;
    let token = app
        .sign_up("Ana", "ana@x.com", "secret1")
        .await
        .session_cookie()
        .unwrap();

    let first = app
        .post_json("/api/auth/sign-out", json!({}), Some(&token))
        .await;
    let second = app
        .post_json("/api/auth/sign-out", json!({}), Some(&token))
        .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_out_without_cookie() {
    let app = spawn_app().await;
    let response = app.post_json("/api/auth/sign-out", json!({}), None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Already signed out");
    assert!(response.set_cookie_header().is_some());
}

#[tokio::test]
async fn test_sign_out_only_ends_one_session() {
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

    app.post_json("/api/auth/sign-out", json!({}), Some(&first))
        .await;

    assert_eq!(app.session(Some(&first)).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.session(Some(&second)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_session_reports_verification_state() {
    let app = spawn_app().await;
    let token = app
        .sign_up("Ana", "ana@x.com", "secret1")
        .await
        .session_cookie()
        .unwrap();
    app.wait_for_mail(1).await;

    let verify_token = app
        .latest_token("ana@x.com", backend_lib::mailer::EmailKind::Verification)
        .await;
    let verified = app
        .get(&format!("/api/auth/verify-email?token={verify_token}"), None)
        .await;
    assert_eq!(verified.status, StatusCode::OK);

    let session = app.session(Some(&token)).await;
    assert_eq!(session.body["user"]["emailVerified"], true);
}
