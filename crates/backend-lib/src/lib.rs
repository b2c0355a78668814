// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core of the authentication server: credential accounts, cookie
//! sessions, email verification and password reset over a relational
//! store.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::auth::{AuthService, DefaultAuth, PasswordHasher};
use crate::config::Settings;
use crate::mailer::{MailQueue, Mailer};
use crate::storage::CredentialStore;

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Settings snapshot taken at startup
    pub settings: Arc<Settings>,
    /// Storage backend
    pub store: Arc<S>,
    /// Outgoing mail
    pub mail: MailQueue,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            settings: Arc::clone(&self.settings),
            store: Arc::clone(&self.store),
            mail: self.mail.clone(),
        }
    }
}

impl<S: CredentialStore + 'static> AppState<S> {
    /// Wire the auth service over `store` and start the mail worker.
    ///
    /// Must run inside a tokio runtime. The returned handle finishes once
    /// every clone of the state is dropped and the mail backlog is sent.
    pub fn new(
        store: S,
        settings: Settings,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<(Self, JoinHandle<()>)> {
        let store = Arc::new(store);
        let hasher = PasswordHasher::new(&settings.password)?;
        let algorithm = hasher.algorithm();
        let (mail, worker) = MailQueue::start(mailer, &settings.mail);
        let auth = Arc::new(DefaultAuth::new(
            Arc::clone(&store),
            &settings,
            hasher,
            mail.clone(),
        ));

        tracing::info!(
            hash = ?algorithm,
            session_ttl_secs = settings.session.ttl_secs,
            "auth service ready"
        );

        Ok((
            Self {
                auth,
                settings: Arc::new(settings),
                store,
                mail,
            },
            worker,
        ))
    }
}
