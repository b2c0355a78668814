// ============================
// backend-lib/src/storage/postgres.rs
// ============================
//! Postgres implementation of [`CredentialStore`] on a sqlx pool.
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use super::{CredentialStore, PasswordResetOutcome, PurgeStats, StoreError};
use crate::config::DatabaseSettings;
use crate::error::DUPLICATE_EMAIL_MESSAGE;
use crate::models::{Account, AccountProvider, Session, User, Verification, VerificationPurpose};

const USER_COLUMNS: &str = "id, name, email, email_verified, image, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: String,
    name: String,
    email: String,
    email_verified: bool,
    image: Option<String>,
    user_created_at: DateTime<Utc>,
    user_updated_at: DateTime<Utc>,
    account_pk: String,
    account_id: String,
    provider_id: String,
    password: Option<String>,
    account_created_at: DateTime<Utc>,
    account_updated_at: DateTime<Utc>,
}

impl From<CredentialRow> for (User, Account) {
    fn from(row: CredentialRow) -> Self {
        let user = User {
            id: row.user_id.clone(),
            name: row.name,
            email: row.email,
            email_verified: row.email_verified,
            image: row.image,
            created_at: row.user_created_at,
            updated_at: row.user_updated_at,
        };
        let account = Account {
            id: row.account_pk,
            account_id: row.account_id,
            provider: AccountProvider::from(row.provider_id.as_str()),
            user_id: row.user_id,
            password_hash: row.password,
            created_at: row.account_created_at,
            updated_at: row.account_updated_at,
        };
        (user, account)
    }
}

#[derive(sqlx::FromRow)]
struct SessionUserRow {
    session_id: String,
    token: String,
    expires_at: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    session_created_at: DateTime<Utc>,
    session_updated_at: DateTime<Utc>,
    user_id: String,
    name: String,
    email: String,
    email_verified: bool,
    image: Option<String>,
    user_created_at: DateTime<Utc>,
    user_updated_at: DateTime<Utc>,
}

impl From<SessionUserRow> for (User, Session) {
    fn from(row: SessionUserRow) -> Self {
        let session = Session {
            id: row.session_id,
            token: row.token,
            user_id: row.user_id.clone(),
            expires_at: row.expires_at,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            created_at: row.session_created_at,
            updated_at: row.session_updated_at,
        };
        let user = User {
            id: row.user_id,
            name: row.name,
            email: row.email,
            email_verified: row.email_verified,
            image: row.image,
            created_at: row.user_created_at,
            updated_at: row.user_updated_at,
        };
        (user, session)
    }
}

#[derive(sqlx::FromRow)]
struct VerificationRow {
    id: String,
    identifier: String,
    value: String,
    purpose: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VerificationRow> for Verification {
    type Error = StoreError;

    fn try_from(row: VerificationRow) -> Result<Self, Self::Error> {
        Ok(Verification {
            purpose: row.purpose.parse().map_err(StoreError::Corrupt)?,
            id: row.id,
            identifier: row.identifier,
            value: row.value,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a unique violation to [`StoreError::Conflict`]
fn conflict_or_database(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        },
        _ => StoreError::Database(err),
    }
}

/// Postgres-backed credential store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool with the configured limits
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        if settings.url.trim().is_empty() {
            return Err(StoreError::Unavailable(
                "database.url (DATABASE_URL) is not set".to_string(),
            ));
        }

        let mut options = PgConnectOptions::from_str(&settings.url)?;
        if settings.pgbouncer_compat {
            // transaction poolers cannot hold prepared statements across checkouts
            options = options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        tracing::info!(max_connections = settings.max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE lower(email) = lower($1)"#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user_with_account(
        &self,
        user: &User,
        account: &Account,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO "user" (id, name, email, email_verified, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.email_verified)
        .bind(&user.image)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or_database(e, DUPLICATE_EMAIL_MESSAGE))?;

        sqlx::query(
            r#"
            INSERT INTO account (id, account_id, provider_id, user_id, password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&account.id)
        .bind(&account.account_id)
        .bind(account.provider.provider_id())
        .bind(&account.user_id)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_credential(&self, email: &str) -> Result<Option<(User, Account)>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, u.email_verified, u.image,
                   u.created_at AS user_created_at, u.updated_at AS user_updated_at,
                   a.id AS account_pk, a.account_id, a.provider_id, a.password,
                   a.created_at AS account_created_at, a.updated_at AS account_updated_at
            FROM "user" u
            JOIN account a ON u.id = a.user_id
            WHERE lower(u.email) = lower($1) AND a.provider_id = $2
            "#,
        )
        .bind(email)
        .bind(AccountProvider::CREDENTIAL_ID)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn mark_email_verified(&self, email: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"UPDATE "user" SET email_verified = TRUE, updated_at = $2 WHERE lower(email) = lower($1)"#,
        )
        .bind(email)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO session (id, token, user_id, expires_at, ip_address, user_agent, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&session.id)
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.expires_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "session token collision"))?;
        Ok(())
    }

    async fn find_live_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(User, Session)>, StoreError> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            r#"
            SELECT s.id AS session_id, s.token, s.expires_at, s.ip_address, s.user_agent,
                   s.created_at AS session_created_at, s.updated_at AS session_updated_at,
                   u.id AS user_id, u.name, u.email, u.email_verified, u.image,
                   u.created_at AS user_created_at, u.updated_at AS user_updated_at
            FROM session s
            JOIN "user" u ON s.user_id = u.id
            WHERE s.token = $1 AND s.expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM session WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_sessions_for_user(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM session WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_verification(&self, verification: &Verification) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO verification (id, identifier, value, purpose, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&verification.id)
        .bind(&verification.identifier)
        .bind(&verification.value)
        .bind(verification.purpose.as_str())
        .bind(verification.expires_at)
        .bind(verification.created_at)
        .bind(verification.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "verification token collision"))?;
        Ok(())
    }

    async fn delete_verifications(
        &self,
        identifier: &str,
        purpose: VerificationPurpose,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM verification WHERE identifier = $1 AND purpose = $2")
            .bind(identifier)
            .bind(purpose.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_verification(
        &self,
        value: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<Verification>, StoreError> {
        let row = sqlx::query_as::<_, VerificationRow>(
            r#"
            SELECT id, identifier, value, purpose, expires_at, created_at, updated_at
            FROM verification
            WHERE value = $1 AND purpose = $2
            "#,
        )
        .bind(value)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Verification::try_from).transpose()
    }

    async fn delete_verification(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM verification WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_password_reset(
        &self,
        verification_id: &str,
        user_id: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<PasswordResetOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken by the delete serializes concurrent redemptions.
        let consumed = sqlx::query("DELETE FROM verification WHERE id = $1")
            .bind(verification_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if consumed == 0 {
            tx.rollback().await?;
            return Ok(PasswordResetOutcome::TokenAlreadyUsed);
        }

        let updated = sqlx::query(
            "UPDATE account SET password = $1, updated_at = $2 WHERE user_id = $3 AND provider_id = $4",
        )
        .bind(password_hash)
        .bind(now)
        .bind(user_id)
        .bind(AccountProvider::CREDENTIAL_ID)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            tx.rollback().await?;
            return Ok(PasswordResetOutcome::NoCredentialAccount);
        }

        tx.commit().await?;
        Ok(PasswordResetOutcome::Applied)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeStats, StoreError> {
        let sessions = sqlx::query("DELETE FROM session WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        let verifications = sqlx::query("DELETE FROM verification WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(PurgeStats {
            sessions,
            verifications,
        })
    }
}
