// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::handlers::{auth, health};
use crate::storage::CredentialStore;
use crate::AppState;

/// Create the application router
pub fn create_router<S: CredentialStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let timeout = Duration::from_secs(state.settings.server.request_timeout_secs);

    let auth_routes = Router::new()
        .route("/sign-up", post(auth::sign_up::<S>))
        .route("/sign-in", post(auth::sign_in::<S>))
        .route("/session", get(auth::get_session::<S>))
        .route("/sign-out", post(auth::sign_out::<S>))
        .route("/forgot-password", post(auth::forgot_password::<S>))
        .route("/reset-password", post(auth::reset_password::<S>))
        .route("/verify-email", get(auth::verify_email::<S>))
        .route("/resend-verification", post(auth::resend_verification::<S>));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route("/ping", get(health::ping))
        .route("/health/db", get(health::database::<S>))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
