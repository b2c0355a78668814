// ============================
// backend-lib/src/storage/memory.rs
// ============================
//! In-process credential store.
//!
//! Used by the `--in-memory` development mode and by tests. Every operation
//! takes one lock over all tables, so multi-row writes are atomic.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{CredentialStore, PasswordResetOutcome, PurgeStats, StoreError};
use crate::error::DUPLICATE_EMAIL_MESSAGE;
use crate::models::{Account, AccountProvider, Session, User, Verification, VerificationPurpose};

/// Store operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Ping,
    FindUser,
    CreateUser,
    MarkVerified,
    InsertSession,
    FindSession,
    DeleteSession,
    DeleteUserSessions,
    InsertVerification,
    DeleteVerifications,
    FindVerification,
    DeleteVerification,
    CompletePasswordReset,
}

#[derive(Default)]
struct Tables {
    /// keyed by user id
    users: HashMap<String, User>,
    /// keyed by account id
    accounts: HashMap<String, Account>,
    /// keyed by token
    sessions: HashMap<String, Session>,
    /// keyed by verification id
    verifications: HashMap<String, Verification>,
}

impl Tables {
    fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.to_lowercase();
        self.users.values().find(|u| u.email.to_lowercase() == email)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    failing: Arc<Mutex<HashSet<StoreOp>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call of `op` fail with [`StoreError::Unavailable`]
    pub fn fail_operation(&self, op: StoreOp) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(op);
        }
    }

    /// Undo [`MemoryStore::fail_operation`]
    pub fn restore_operation(&self, op: StoreOp) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(&op);
        }
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        let failing = self
            .failing
            .lock()
            .map_err(|_| StoreError::Unavailable("failure registry poisoned".to_string()))?;
        if failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} disabled")));
        }
        Ok(())
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn account_count(&self) -> usize {
        self.tables.read().await.accounts.len()
    }

    /// Number of session rows, live or expired
    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }

    /// Outstanding tokens for an identifier and purpose, oldest first
    pub async fn verifications_for(
        &self,
        identifier: &str,
        purpose: VerificationPurpose,
    ) -> Vec<Verification> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Verification> = tables
            .verifications
            .values()
            .filter(|v| v.identifier == identifier && v.purpose == purpose)
            .cloned()
            .collect();
        rows.sort_by_key(|v| v.created_at);
        rows
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check(StoreOp::Ping)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check(StoreOp::FindUser)?;
        Ok(self.tables.read().await.user_by_email(email).cloned())
    }

    async fn create_user_with_account(
        &self,
        user: &User,
        account: &Account,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::CreateUser)?;
        let mut tables = self.tables.write().await;
        if tables.user_by_email(&user.email).is_some() {
            return Err(StoreError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string()));
        }
        tables.users.insert(user.id.clone(), user.clone());
        tables.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn find_credential(&self, email: &str) -> Result<Option<(User, Account)>, StoreError> {
        self.check(StoreOp::FindUser)?;
        let tables = self.tables.read().await;
        let Some(user) = tables.user_by_email(email) else {
            return Ok(None);
        };
        let account = tables
            .accounts
            .values()
            .find(|a| a.user_id == user.id && a.provider == AccountProvider::Credential);
        Ok(account.map(|a| (user.clone(), a.clone())))
    }

    async fn mark_email_verified(&self, email: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.check(StoreOp::MarkVerified)?;
        let email = email.to_lowercase();
        let mut tables = self.tables.write().await;
        match tables
            .users
            .values_mut()
            .find(|u| u.email.to_lowercase() == email)
        {
            Some(user) => {
                user.email_verified = true;
                user.updated_at = now;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.check(StoreOp::InsertSession)?;
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.token) {
            return Err(StoreError::Conflict("session token collision".to_string()));
        }
        tables.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_live_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(User, Session)>, StoreError> {
        self.check(StoreOp::FindSession)?;
        let tables = self.tables.read().await;
        let found = tables
            .sessions
            .get(token)
            .filter(|s| s.is_live(now))
            .and_then(|s| tables.users.get(&s.user_id).map(|u| (u.clone(), s.clone())));
        Ok(found)
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        self.check(StoreOp::DeleteSession)?;
        Ok(self.tables.write().await.sessions.remove(token).is_some())
    }

    async fn delete_sessions_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        self.check(StoreOp::DeleteUserSessions)?;
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - tables.sessions.len()) as u64)
    }

    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError> {
        self.check(StoreOp::InsertVerification)?;
        let mut tables = self.tables.write().await;
        if tables.verifications.values().any(|v| v.value == verification.value) {
            return Err(StoreError::Conflict("verification token collision".to_string()));
        }
        tables
            .verifications
            .insert(verification.id.clone(), verification.clone());
        Ok(())
    }

    async fn delete_verifications(
        &self,
        identifier: &str,
        purpose: VerificationPurpose,
    ) -> Result<u64, StoreError> {
        self.check(StoreOp::DeleteVerifications)?;
        let mut tables = self.tables.write().await;
        let before = tables.verifications.len();
        tables
            .verifications
            .retain(|_, v| !(v.identifier == identifier && v.purpose == purpose));
        Ok((before - tables.verifications.len()) as u64)
    }

    async fn find_verification(
        &self,
        value: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<Verification>, StoreError> {
        self.check(StoreOp::FindVerification)?;
        let tables = self.tables.read().await;
        Ok(tables
            .verifications
            .values()
            .find(|v| v.value == value && v.purpose == purpose)
            .cloned())
    }

    async fn delete_verification(&self, id: &str) -> Result<bool, StoreError> {
        self.check(StoreOp::DeleteVerification)?;
        Ok(self.tables.write().await.verifications.remove(id).is_some())
    }

    async fn complete_password_reset(
        &self,
        verification_id: &str,
        user_id: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<PasswordResetOutcome, StoreError> {
        self.check(StoreOp::CompletePasswordReset)?;
        let mut tables = self.tables.write().await;

        if !tables.verifications.contains_key(verification_id) {
            return Ok(PasswordResetOutcome::TokenAlreadyUsed);
        }
        let Some(account) = tables
            .accounts
            .values_mut()
            .find(|a| a.user_id == user_id && a.provider == AccountProvider::Credential)
        else {
            return Ok(PasswordResetOutcome::NoCredentialAccount);
        };

        account.password_hash = Some(password_hash.to_string());
        account.updated_at = now;
        tables.verifications.remove(verification_id);
        Ok(PasswordResetOutcome::Applied)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeStats, StoreError> {
        let mut tables = self.tables.write().await;
        let sessions_before = tables.sessions.len();
        let verifications_before = tables.verifications.len();
        tables.sessions.retain(|_, s| s.is_live(now));
        tables.verifications.retain(|_, v| v.is_live(now));
        Ok(PurgeStats {
            sessions: (sessions_before - tables.sessions.len()) as u64,
            verifications: (verifications_before - tables.verifications.len()) as u64,
        })
    }
}
