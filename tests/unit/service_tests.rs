// ===========================
// tests/unit/service_tests.rs
// ===========================
//! `DefaultAuth` against the in-memory store, including injected store
//! failures on secondary writes.
use std::sync::Arc;

use auth_common::{SignInRequest, SignUpRequest};
use backend_lib::auth::{AuthService, ClientMeta, DefaultAuth, PasswordHasher};
use backend_lib::error::AppError;
use backend_lib::mailer::{EmailKind, MailQueue, RecordingMailer};
use backend_lib::models::{Account, User, VerificationPurpose};
use backend_lib::storage::{CredentialStore, MemoryStore, StoreOp};
use chrono::Utc;

use crate::test_utils::{test_settings, token_from_email};

struct Harness {
    auth: Arc<DefaultAuth<MemoryStore>>,
    store: MemoryStore,
    mailer: RecordingMailer,
}

fn harness() -> Harness {
    let settings = test_settings();
    let store = MemoryStore::new();
    let mailer = RecordingMailer::new();
    let (queue, _worker) = MailQueue::start(Arc::new(mailer.clone()), &settings.mail);
    let hasher = PasswordHasher::new(&settings.password).unwrap();
    let auth = DefaultAuth::new(Arc::new(store.clone()), &settings, hasher, queue);
    Harness {
        auth: Arc::new(auth),
        store,
        mailer,
    }
}

fn sign_up_request(email: &str) -> SignUpRequest {
    SignUpRequest {
        name: "Ana".to_string(),
        email: email.to_string(),
        password: "secret1".to_string(),
    }
}

fn sign_in_request(email: &str, password: &str) -> SignInRequest {
    SignInRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

/// Insert a user whose address was stored with its original capitalisation
async fn seed_mixed_case_user(h: &Harness) -> User {
    let hasher = PasswordHasher::new(&test_settings().password).unwrap();
    let digest = hasher.hash("secret1".to_string()).await.unwrap();
    let now = Utc::now();
    let user = User::new(
        "legacy-user".to_string(),
        "Ana".to_string(),
        "Ana@X.com".to_string(),
        now,
    );
    let account = Account::credential("legacy-account".to_string(), &user, digest, now);
    h.store.create_user_with_account(&user, &account).await.unwrap();
    user
}

#[tokio::test]
async fn test_sign_up_normalizes_email() {
    let h = harness();
    let (user, session) = h
        .auth
        .sign_up(sign_up_request("  Ana@X.com "), ClientMeta::default())
        .await
        .unwrap();

    assert_eq!(user.email, "ana@x.com");
    assert!(!user.email_verified);
    assert_eq!(session.user_id, user.id);

    let signed_in = h
        .auth
        .sign_in(
            SignInRequest {
                email: "ANA@x.com".to_string(),
                password: "secret1".to_string(),
            },
            ClientMeta::default(),
        )
        .await;
    assert!(signed_in.is_ok());
}

#[tokio::test]
async fn test_sign_up_survives_verification_failure() {
    let h = harness();
    h.store.fail_operation(StoreOp::InsertVerification);

    let result = h
        .auth
        .sign_up(sign_up_request("ana@x.com"), ClientMeta::default())
        .await;
    assert!(result.is_ok());
    assert_eq!(h.store.user_count().await, 1);
    assert!(h.mailer.sent().await.is_empty());

    // the user can ask again once the store recovers
    h.store.restore_operation(StoreOp::InsertVerification);
    h.auth.resend_verification("ana@x.com").await.unwrap();
    h.mailer.wait_for(1).await;
}

#[tokio::test]
async fn test_concurrent_duplicate_sign_ups() {
    let h = harness();
    let first = {
        let auth = Arc::clone(&h.auth);
        tokio::spawn(async move {
            auth.sign_up(sign_up_request("ana@x.com"), ClientMeta::default())
                .await
        })
    };
    let second = {
        let auth = Arc::clone(&h.auth);
        tokio::spawn(async move {
            auth.sign_up(sign_up_request("ana@x.com"), ClientMeta::default())
                .await
        })
    };

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let created = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();

    assert_eq!(created, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(h.store.user_count().await, 1);
    assert_eq!(h.store.account_count().await, 1);
}

#[tokio::test]
async fn test_get_session_failures_look_identical() {
    let h = harness();
    let missing = h.auth.get_session(None).await.unwrap_err();
    let unknown = h.auth.get_session(Some("nope")).await.unwrap_err();

    assert_eq!(missing.status_code(), unknown.status_code());
    assert_eq!(missing.to_string(), unknown.to_string());
}

#[tokio::test]
async fn test_sign_out_swallows_store_failure() {
    let h = harness();
    let (_, session) = h
        .auth
        .sign_up(sign_up_request("ana@x.com"), ClientMeta::default())
        .await
        .unwrap();

    h.store.fail_operation(StoreOp::DeleteSession);
    h.auth.sign_out(Some(&session.token)).await;
    h.auth.sign_out(None).await;
}

#[tokio::test]
async fn test_reset_succeeds_when_session_revocation_fails() {
    let h = harness();
    h.auth
        .sign_up(sign_up_request("ana@x.com"), ClientMeta::default())
        .await
        .unwrap();
    h.auth.forgot_password("ana@x.com").await.unwrap();
    h.mailer.wait_for(2).await;
    let email = h
        .mailer
        .last_to("ana@x.com", EmailKind::PasswordReset)
        .await
        .unwrap();

    h.store.fail_operation(StoreOp::DeleteUserSessions);
    h.auth
        .reset_password(&token_from_email(&email), "newpass123".to_string())
        .await
        .unwrap();

    let signed_in = h
        .auth
        .sign_in(
            SignInRequest {
                email: "ana@x.com".to_string(),
                password: "newpass123".to_string(),
            },
            ClientMeta::default(),
        )
        .await;
    assert!(signed_in.is_ok());
}

#[tokio::test]
async fn test_reset_store_failure_changes_nothing() {
    let h = harness();
    h.auth
        .sign_up(sign_up_request("ana@x.com"), ClientMeta::default())
        .await
        .unwrap();
    h.auth.forgot_password("ana@x.com").await.unwrap();
    h.mailer.wait_for(2).await;
    let email = h
        .mailer
        .last_to("ana@x.com", EmailKind::PasswordReset)
        .await
        .unwrap();

    h.store.fail_operation(StoreOp::CompletePasswordReset);
    let err = h
        .auth
        .reset_password(&token_from_email(&email), "newpass123".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Store(_)));

    // token still outstanding, old password still valid
    assert_eq!(
        h.store
            .verifications_for("ana@x.com", VerificationPurpose::PasswordReset)
            .await
            .len(),
        1
    );
    let old = h
        .auth
        .sign_in(
            SignInRequest {
                email: "ana@x.com".to_string(),
                password: "secret1".to_string(),
            },
            ClientMeta::default(),
        )
        .await;
    assert!(old.is_ok());
}

#[tokio::test]
async fn test_verify_email_survives_token_deletion_failure() {
    let h = harness();
    h.auth
        .sign_up(sign_up_request("ana@x.com"), ClientMeta::default())
        .await
        .unwrap();
    h.mailer.wait_for(1).await;
    let email = h
        .mailer
        .last_to("ana@x.com", EmailKind::Verification)
        .await
        .unwrap();

    h.store.fail_operation(StoreOp::DeleteVerification);
    h.auth
        .verify_email(Some(&token_from_email(&email)))
        .await
        .unwrap();

    let (user, _) = h
        .auth
        .sign_in(
            SignInRequest {
                email: "ana@x.com".to_string(),
                password: "secret1".to_string(),
            },
            ClientMeta::default(),
        )
        .await
        .unwrap();
    assert!(user.email_verified);
}

#[tokio::test]
async fn test_sign_in_with_store_down_is_500() {
    let h = harness();
    h.store.fail_operation(StoreOp::FindUser);
    let err = h
        .auth
        .sign_in(
            SignInRequest {
                email: "ana@x.com".to_string(),
                password: "secret1".to_string(),
            },
            ClientMeta::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code().as_u16(), 500);
}

#[tokio::test]
async fn test_mixed_case_row_can_sign_in() {
    let h = harness();
    let seeded = seed_mixed_case_user(&h).await;

    for typed in ["Ana@X.com", "ana@x.com", "ANA@X.COM"] {
        let (user, _) = h
            .auth
            .sign_in(sign_in_request(typed, "secret1"), ClientMeta::default())
            .await
            .unwrap();
        assert_eq!(user.id, seeded.id);
        assert_eq!(user.email, "Ana@X.com");
    }
}

#[tokio::test]
async fn test_mixed_case_row_blocks_lowercase_sign_up() {
    let h = harness();
    seed_mixed_case_user(&h).await;

    let err = h
        .auth
        .sign_up(sign_up_request("ana@x.com"), ClientMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(h.store.user_count().await, 1);
}

#[tokio::test]
async fn test_mixed_case_row_can_verify_and_reset() {
    let h = harness();
    seed_mixed_case_user(&h).await;

    h.auth.resend_verification("ana@x.com").await.unwrap();
    h.mailer.wait_for(1).await;
    let verification = h
        .mailer
        .last_to("Ana@X.com", EmailKind::Verification)
        .await
        .unwrap();
    h.auth
        .verify_email(Some(&token_from_email(&verification)))
        .await
        .unwrap();

    h.auth.forgot_password("ana@x.com").await.unwrap();
    h.mailer.wait_for(2).await;
    let reset = h
        .mailer
        .last_to("Ana@X.com", EmailKind::PasswordReset)
        .await
        .unwrap();
    h.auth
        .reset_password(&token_from_email(&reset), "newpass123".to_string())
        .await
        .unwrap();

    let (user, _) = h
        .auth
        .sign_in(sign_in_request("ana@x.com", "newpass123"), ClientMeta::default())
        .await
        .unwrap();
    assert!(user.email_verified);
}
