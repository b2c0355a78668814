// ============================
// crates/backend-lib/src/auth/service.rs
// ============================
use async_trait::async_trait;
use auth_common::{SignInRequest, SignUpRequest};

use super::ClientMeta;
use crate::error::AppError;
use crate::models::{Session, User};

/// Account and session operations behind the `/api/auth` routes
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a credential account and open its first session
    async fn sign_up(&self, req: SignUpRequest, client: ClientMeta) -> Result<(User, Session), AppError>;

    async fn sign_in(&self, req: SignInRequest, client: ClientMeta) -> Result<(User, Session), AppError>;

    /// Resolve the session cookie; every failure is the same `Auth` error
    async fn get_session(&self, token: Option<&str>) -> Result<(User, Session), AppError>;

    /// Never fails from the caller's point of view
    async fn sign_out(&self, token: Option<&str>);

    /// Mail a reset link when the email is registered. Unknown emails
    /// succeed silently.
    async fn forgot_password(&self, email: &str) -> Result<(), AppError>;

    async fn reset_password(&self, token: &str, new_password: String) -> Result<(), AppError>;

    async fn verify_email(&self, token: Option<&str>) -> Result<(), AppError>;

    /// Mail a fresh verification link. Unknown emails succeed silently.
    async fn resend_verification(&self, email: &str) -> Result<(), AppError>;
}
