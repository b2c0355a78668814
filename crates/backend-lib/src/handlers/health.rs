// ============================
// crates/backend-lib/src/handlers/health.rs
// ============================
//! Liveness and database health probes.
use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::storage::CredentialStore;
use crate::AppState;

/// GET /ping
pub async fn ping() -> Json<Value> {
    Json(json!({
        "message": "pong",
        "status": "auth server is running",
    }))
}

/// GET /health/db
pub async fn database<S: CredentialStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Value>, AppError> {
    state.store.ping().await?;
    Ok(Json(json!({
        "message": "database connection ok",
        "status": "ok",
    })))
}
