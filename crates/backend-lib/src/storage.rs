// ============================
// backend-lib/src/storage.rs
// ============================
//! Storage abstraction over the four auth tables, with a Postgres
//! implementation and an in-memory one.
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Account, Session, User, Verification, VerificationPurpose};

pub use memory::{MemoryStore, StoreOp};
pub use postgres::PgStore;

/// Errors raised by a credential store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness constraint rejected the write
    #[error("{0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A row could not be mapped back into a record
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Result of applying a password reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordResetOutcome {
    /// Password replaced and token consumed
    Applied,
    /// The token was consumed by someone else first; nothing changed
    TokenAlreadyUsed,
    /// The user has no credential account; nothing changed
    NoCredentialAccount,
}

/// Rows removed by a purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub sessions: u64,
    pub verifications: u64,
}

/// Trait for credential store backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Cheap round trip proving the store answers
    async fn ping(&self) -> Result<(), StoreError>;

    /// Email lookups ignore case; rows written before sign-up lowercased
    /// addresses keep their original spelling.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Insert a user and its credential account together.
    ///
    /// Either both rows exist afterwards or neither does. A duplicate email
    /// yields [`StoreError::Conflict`].
    async fn create_user_with_account(
        &self,
        user: &User,
        account: &Account,
    ) -> Result<(), StoreError>;

    /// The user and credential account registered under an email
    async fn find_credential(&self, email: &str) -> Result<Option<(User, Account)>, StoreError>;

    /// Flag the user owning `email` as verified. Returns whether a user matched.
    async fn mark_email_verified(&self, email: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Session with this exact token that is still live at `now`, with its owner
    async fn find_live_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(User, Session)>, StoreError>;

    /// Returns whether a row was deleted
    async fn delete_session(&self, token: &str) -> Result<bool, StoreError>;

    async fn delete_sessions_for_user(&self, user_id: &str) -> Result<u64, StoreError>;

    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError>;

    /// Delete every token issued to `identifier` for `purpose`
    async fn delete_verifications(
        &self,
        identifier: &str,
        purpose: VerificationPurpose,
    ) -> Result<u64, StoreError>;

    /// Token with this exact value and purpose, expired or not
    async fn find_verification(
        &self,
        value: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<Verification>, StoreError>;

    async fn delete_verification(&self, id: &str) -> Result<bool, StoreError>;

    /// Consume a reset token and replace the user's credential password as
    /// one unit.
    async fn complete_password_reset(
        &self,
        verification_id: &str,
        user_id: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<PasswordResetOutcome, StoreError>;

    /// Remove sessions and verification rows that expired before `now`
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeStats, StoreError>;
}
