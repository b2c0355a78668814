// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session lifecycle: creation, lookup and revocation.
//!
//! Sessions live in the credential store. Expired rows stay until purged
//! but never resolve.
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;

use super::token_generator::{generate_secure_token, new_id};
use super::ClientMeta;
use crate::config::{ttl_span, SessionSettings};
use crate::metrics::{SESSION_CREATED, SESSION_REVOKED};
use crate::models::{Session, User};
use crate::storage::{CredentialStore, StoreError};

/// Attempts at inserting a session before a token collision is reported
const MAX_TOKEN_ATTEMPTS: usize = 3;

/// Session manager backed by a credential store
pub struct SessionManager<S> {
    store: Arc<S>,
    ttl: chrono::Duration,
}

impl<S> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ttl: self.ttl,
        }
    }
}

impl<S: CredentialStore> SessionManager<S> {
    pub fn new(store: Arc<S>, settings: &SessionSettings) -> Self {
        Self {
            store,
            ttl: ttl_span(settings.ttl_secs),
        }
    }

    /// Open a new session for `user_id`
    pub async fn create(&self, user_id: &str, client: &ClientMeta) -> Result<Session, StoreError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();
            let session = Session {
                id: new_id(),
                token: generate_secure_token(),
                user_id: user_id.to_string(),
                expires_at: now + self.ttl,
                ip_address: client.ip.map(|ip| ip.to_string()),
                user_agent: client.user_agent.clone(),
                created_at: now,
                updated_at: now,
            };

            match self.store.insert_session(&session).await {
                Ok(()) => {
                    counter!(SESSION_CREATED).increment(1);
                    tracing::debug!(user_id, session_id = %session.id, "session created");
                    return Ok(session);
                },
                Err(StoreError::Conflict(_)) if attempt < MAX_TOKEN_ATTEMPTS => {
                    tracing::warn!(user_id, attempt, "session token collision, regenerating");
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// The live session carrying `token` and its owner
    pub async fn resolve(&self, token: &str) -> Result<Option<(User, Session)>, StoreError> {
        self.store.find_live_session(token, Utc::now()).await
    }

    /// Delete the session carrying `token`. Absent tokens are a no-op.
    pub async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        if self.store.delete_session(token).await? {
            counter!(SESSION_REVOKED).increment(1);
        } else {
            tracing::debug!("revoked token had no session");
        }
        Ok(())
    }

    /// Delete every session of a user, returning how many were removed
    pub async fn revoke_all_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let removed = self.store.delete_sessions_for_user(user_id).await?;
        counter!(SESSION_REVOKED).increment(removed);
        tracing::info!(user_id, removed, "revoked all sessions");
        Ok(removed)
    }
}
