// ============================
// backend-lib/src/models.rs
// ============================
//! Persisted records: users, credential accounts, sessions and
//! verification tokens.

use auth_common::{SessionInfo, UserInfo};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// A registered user
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: String, name: String, email: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            email,
            email_verified: false,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            image: user.image.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// How an account authenticates.
///
/// Persisted in `account.provider_id`: `"credential"` for email/password,
/// the provider name otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountProvider {
    Credential,
    OAuth { provider: String },
}

impl AccountProvider {
    pub const CREDENTIAL_ID: &'static str = "credential";

    pub fn provider_id(&self) -> &str {
        match self {
            AccountProvider::Credential => Self::CREDENTIAL_ID,
            AccountProvider::OAuth { provider } => provider,
        }
    }
}

impl From<&str> for AccountProvider {
    fn from(provider_id: &str) -> Self {
        if provider_id == Self::CREDENTIAL_ID {
            AccountProvider::Credential
        } else {
            AccountProvider::OAuth {
                provider: provider_id.to_string(),
            }
        }
    }
}

/// Binding between a user and a way of signing in
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    /// Provider-side identifier; the email for credential accounts
    pub account_id: String,
    pub provider: AccountProvider,
    pub user_id: String,
    /// PHC (or legacy bcrypt) digest, only set for credential accounts
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn credential(
        id: String,
        user: &User,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id: user.email.clone(),
            provider: AccountProvider::Credential,
            user_id: user.id.clone(),
            password_hash: Some(password_hash),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A login session bound to one user
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Live while `expires_at` is strictly in the future
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        SessionInfo {
            id: session.id.clone(),
            token: session.token.clone(),
            user_id: session.user_id.clone(),
            expires_at: session.expires_at,
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// What a verification token authorizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationPurpose {
    EmailVerification,
    PasswordReset,
}

impl VerificationPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationPurpose::EmailVerification => "email_verification",
            VerificationPurpose::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for VerificationPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(VerificationPurpose::EmailVerification),
            "password_reset" => Ok(VerificationPurpose::PasswordReset),
            other => Err(format!("unknown verification purpose: {other}")),
        }
    }
}

/// A single-use token sent out of band
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub id: String,
    /// Email address the token was sent to
    pub identifier: String,
    /// The token itself
    pub value: String,
    pub purpose: VerificationPurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Verification {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
