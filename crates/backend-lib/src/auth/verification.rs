// ============================
// crates/backend-lib/src/auth/verification.rs
// ============================
//! Single-use tokens for email verification and password reset.
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use thiserror::Error;

use super::token_generator::{generate_secure_token, new_id};
use crate::config::{ttl_span, VerificationSettings};
use crate::metrics::{VERIFICATION_ISSUED, VERIFICATION_REDEEMED, VERIFICATION_REJECTED};
use crate::models::{Verification, VerificationPurpose};
use crate::storage::{CredentialStore, StoreError};

/// Why a token could not be redeemed
#[derive(Error, Debug)]
pub enum RedeemError {
    #[error("verification token not found")]
    NotFound,

    #[error("verification token expired")]
    Expired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct VerificationManager<S> {
    store: Arc<S>,
    email_ttl: chrono::Duration,
    password_reset_ttl: chrono::Duration,
}

impl<S> Clone for VerificationManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            email_ttl: self.email_ttl,
            password_reset_ttl: self.password_reset_ttl,
        }
    }
}

impl<S: CredentialStore> VerificationManager<S> {
    pub fn new(store: Arc<S>, settings: &VerificationSettings) -> Self {
        Self {
            store,
            email_ttl: ttl_span(settings.email_ttl_secs),
            password_reset_ttl: ttl_span(settings.password_reset_ttl_secs),
        }
    }

    pub fn ttl(&self, purpose: VerificationPurpose) -> chrono::Duration {
        match purpose {
            VerificationPurpose::EmailVerification => self.email_ttl,
            VerificationPurpose::PasswordReset => self.password_reset_ttl,
        }
    }

    /// Issue a fresh token, superseding earlier ones for the same
    /// identifier and purpose.
    ///
    /// Delete and insert are separate writes; a race may leave two live
    /// tokens, each still single use.
    pub async fn issue(
        &self,
        identifier: &str,
        purpose: VerificationPurpose,
    ) -> Result<Verification, StoreError> {
        let superseded = self.store.delete_verifications(identifier, purpose).await?;
        if superseded > 0 {
            tracing::debug!(identifier, %purpose, superseded, "superseded earlier tokens");
        }

        let now = Utc::now();
        let verification = Verification {
            id: new_id(),
            identifier: identifier.to_string(),
            value: generate_secure_token(),
            purpose,
            expires_at: now + self.ttl(purpose),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_verification(&verification).await?;

        counter!(VERIFICATION_ISSUED, "purpose" => purpose.as_str()).increment(1);
        Ok(verification)
    }

    /// Look up a live token. The row is left in place; consuming it is up
    /// to the caller.
    pub async fn redeem(
        &self,
        token: &str,
        purpose: VerificationPurpose,
    ) -> Result<Verification, RedeemError> {
        let Some(verification) = self.store.find_verification(token, purpose).await? else {
            counter!(VERIFICATION_REJECTED, "reason" => "not_found").increment(1);
            return Err(RedeemError::NotFound);
        };

        if !verification.is_live(Utc::now()) {
            counter!(VERIFICATION_REJECTED, "reason" => "expired").increment(1);
            return Err(RedeemError::Expired);
        }

        counter!(VERIFICATION_REDEEMED, "purpose" => purpose.as_str()).increment(1);
        Ok(verification)
    }

    /// Delete a redeemed token. Failures are logged, not returned.
    pub async fn discard(&self, verification: &Verification) {
        if let Err(e) = self.store.delete_verification(&verification.id).await {
            tracing::warn!(
                error = %e,
                verification_id = %verification.id,
                "failed to delete redeemed verification token"
            );
        }
    }
}
