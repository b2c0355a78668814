// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! `/api/auth/*` handlers.
use std::sync::Arc;

use auth_common::{
    AuthResponse, EmailRequest, MessageResponse, ResetPasswordRequest, SignInRequest,
    SignUpRequest, TokenQuery,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use super::extract::SessionToken;
use crate::auth::{cookie, ClientMeta};
use crate::config::SessionSettings;
use crate::error::AppError;
use crate::models::{Session, User};
use crate::storage::CredentialStore;
use crate::AppState;

pub const SIGNED_OUT_MESSAGE: &str = "Signed out successfully";
pub const ALREADY_SIGNED_OUT_MESSAGE: &str = "Already signed out";
pub const RESET_REQUESTED_MESSAGE: &str =
    "If the email exists, you will receive instructions to reset your password";
pub const PASSWORD_RESET_MESSAGE: &str = "Password reset successfully";
pub const EMAIL_VERIFIED_MESSAGE: &str = "Email verified successfully";
pub const VERIFICATION_SENT_MESSAGE: &str = "If the email exists, a verification link has been sent";

type Shared<S> = State<Arc<AppState<S>>>;

/// `{user, session}` body plus the session cookie
fn session_response(settings: &SessionSettings, user: &User, session: &Session) -> Response {
    let body = AuthResponse {
        user: user.into(),
        session: session.into(),
    };
    let mut response = Json(body).into_response();
    match cookie::session_cookie(&session.token, settings) {
        Some(value) => {
            response.headers_mut().insert(header::SET_COOKIE, value);
        },
        None => tracing::error!(session_id = %session.id, "session token is not a valid cookie value"),
    }
    response
}

/// POST /api/auth/sign-up
pub async fn sign_up<S: CredentialStore + 'static>(
    State(state): Shared<S>,
    client: ClientMeta,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body?;
    let (user, session) = state.auth.sign_up(req, client).await?;
    Ok(session_response(&state.settings.session, &user, &session))
}

/// POST /api/auth/sign-in
pub async fn sign_in<S: CredentialStore + 'static>(
    State(state): Shared<S>,
    client: ClientMeta,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = body?;
    let (user, session) = state.auth.sign_in(req, client).await?;
    Ok(session_response(&state.settings.session, &user, &session))
}

/// GET /api/auth/session
pub async fn get_session<S: CredentialStore + 'static>(
    State(state): Shared<S>,
    SessionToken(token): SessionToken,
) -> Result<Json<AuthResponse>, AppError> {
    let (user, session) = state.auth.get_session(token.as_deref()).await?;
    Ok(Json(AuthResponse {
        user: (&user).into(),
        session: (&session).into(),
    }))
}

/// POST /api/auth/sign-out
pub async fn sign_out<S: CredentialStore + 'static>(
    State(state): Shared<S>,
    SessionToken(token): SessionToken,
) -> Response {
    let message = if token.is_some() {
        SIGNED_OUT_MESSAGE
    } else {
        ALREADY_SIGNED_OUT_MESSAGE
    };
    state.auth.sign_out(token.as_deref()).await;

    let mut response = Json(MessageResponse::new(message)).into_response();
    if let Some(value) = cookie::clear_cookie(&state.settings.session) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// POST /api/auth/forgot-password
pub async fn forgot_password<S: CredentialStore + 'static>(
    State(state): Shared<S>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = body?;
    state.auth.forgot_password(&req.email).await?;
    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

/// POST /api/auth/reset-password
pub async fn reset_password<S: CredentialStore + 'static>(
    State(state): Shared<S>,
    body: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = body?;
    state.auth.reset_password(&req.token, req.new_password).await?;
    Ok(Json(MessageResponse::new(PASSWORD_RESET_MESSAGE)))
}

/// GET /api/auth/verify-email?token=
pub async fn verify_email<S: CredentialStore + 'static>(
    State(state): Shared<S>,
    query: Result<Query<TokenQuery>, QueryRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Query(query) = query?;
    state.auth.verify_email(query.token.as_deref()).await?;
    Ok(Json(MessageResponse::success(EMAIL_VERIFIED_MESSAGE)))
}

/// POST /api/auth/resend-verification
pub async fn resend_verification<S: CredentialStore + 'static>(
    State(state): Shared<S>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = body?;
    state.auth.resend_verification(&req.email).await?;
    Ok(Json(MessageResponse::new(VERIFICATION_SENT_MESSAGE)))
}
