// ============================
// crates/backend-lib/src/auth/service_impl.rs
// ============================
use std::sync::Arc;

use async_trait::async_trait;
use auth_common::{SignInRequest, SignUpRequest};
use chrono::Utc;
use metrics::counter;

use super::rate_limit::AuthRateLimiter;
use super::token_generator::new_id;
use super::verification::{RedeemError, VerificationManager};
use super::{AuthService, ClientMeta, PasswordHasher, SessionManager};
use crate::config::{AppSettings, PasswordSettings, Settings};
use crate::error::{AppError, DUPLICATE_EMAIL_MESSAGE, SESSION_MESSAGE, UNAUTHORIZED_MESSAGE};
use crate::mailer::{templates, MailQueue};
use crate::metrics::{PASSWORD_RESET, SIGN_IN, SIGN_IN_FAILED, SIGN_UP};
use crate::models::{Account, Session, User, VerificationPurpose};
use crate::storage::{CredentialStore, PasswordResetOutcome};
use crate::validation::{
    validate_email, validate_name, validate_password, validate_password_present, validate_token,
};

/// Store-backed [`AuthService`]
pub struct DefaultAuth<S> {
    store: Arc<S>,
    sessions: SessionManager<S>,
    verifications: VerificationManager<S>,
    hasher: PasswordHasher,
    limiter: AuthRateLimiter,
    mail: MailQueue,
    app: AppSettings,
    password_policy: PasswordSettings,
}

impl<S: CredentialStore> DefaultAuth<S> {
    pub fn new(store: Arc<S>, settings: &Settings, hasher: PasswordHasher, mail: MailQueue) -> Self {
        Self {
            sessions: SessionManager::new(Arc::clone(&store), &settings.session),
            verifications: VerificationManager::new(Arc::clone(&store), &settings.verification),
            store,
            hasher,
            limiter: AuthRateLimiter::from_settings(&settings.rate_limit),
            mail,
            app: settings.app.clone(),
            password_policy: settings.password.clone(),
        }
    }

    /// Issue an email verification token and queue the email
    async fn send_verification(&self, email: &str) -> Result<(), AppError> {
        let verification = self
            .verifications
            .issue(email, VerificationPurpose::EmailVerification)
            .await?;
        self.mail.enqueue(templates::verification_email(
            &self.app,
            email,
            &verification.value,
            self.verifications.ttl(VerificationPurpose::EmailVerification),
        ));
        Ok(())
    }

    fn reject_credentials(&self, client: &ClientMeta) -> AppError {
        if let Some(ip) = client.ip {
            self.limiter.record_failed_attempt(ip);
        }
        counter!(SIGN_IN_FAILED).increment(1);
        AppError::Auth(UNAUTHORIZED_MESSAGE.to_string())
    }
}

fn redeem_error(err: RedeemError) -> AppError {
    match err {
        RedeemError::NotFound | RedeemError::Expired => AppError::InvalidToken,
        RedeemError::Store(e) => e.into(),
    }
}

#[async_trait]
impl<S: CredentialStore + 'static> AuthService for DefaultAuth<S> {
    async fn sign_up(&self, req: SignUpRequest, client: ClientMeta) -> Result<(User, Session), AppError> {
        let name = validate_name(&req.name)?;
        let email = validate_email(&req.email)?;
        validate_password(&req.password, &self.password_policy)?;

        // fast path only; the unique constraint decides races
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.to_string()));
        }

        let digest = self.hasher.hash(req.password).await?;
        let now = Utc::now();
        let user = User::new(new_id(), name, email, now);
        let account = Account::credential(new_id(), &user, digest, now);
        self.store.create_user_with_account(&user, &account).await?;

        let session = self.sessions.create(&user.id, &client).await?;
        counter!(SIGN_UP).increment(1);
        tracing::info!(user_id = %user.id, "user signed up");

        if let Err(e) = self.send_verification(&user.email).await {
            tracing::warn!(error = %e, user_id = %user.id, "could not issue verification token at sign-up");
        }

        Ok((user, session))
    }

    async fn sign_in(&self, req: SignInRequest, client: ClientMeta) -> Result<(User, Session), AppError> {
        if let Some(ip) = client.ip {
            if !self.limiter.check_rate_limit(ip) {
                return Err(AppError::AuthRateLimited);
            }
        }

        let email = validate_email(&req.email)?;
        validate_password_present(&req.password)?;

        let credential = self.store.find_credential(&email).await?;
        let digest = credential
            .as_ref()
            .and_then(|(_, account)| account.password_hash.clone());

        let user = match (credential, digest) {
            (Some((user, _)), Some(digest)) => {
                if !self.hasher.verify(digest, req.password).await {
                    tracing::debug!(user_id = %user.id, "sign-in with wrong password");
                    return Err(self.reject_credentials(&client));
                }
                user
            },
            _ => {
                self.hasher.dummy_verify(req.password).await;
                tracing::debug!("sign-in for unknown credential");
                return Err(self.reject_credentials(&client));
            },
        };

        if let Some(ip) = client.ip {
            self.limiter.record_success(ip);
        }
        let session = self.sessions.create(&user.id, &client).await?;
        counter!(SIGN_IN).increment(1);
        tracing::info!(user_id = %user.id, "user signed in");
        Ok((user, session))
    }

    async fn get_session(&self, token: Option<&str>) -> Result<(User, Session), AppError> {
        let unauthorized = || AppError::Auth(SESSION_MESSAGE.to_string());
        let token = token.ok_or_else(unauthorized)?;
        self.sessions.resolve(token).await?.ok_or_else(unauthorized)
    }

    async fn sign_out(&self, token: Option<&str>) {
        let Some(token) = token else {
            return;
        };
        if let Err(e) = self.sessions.revoke(token).await {
            tracing::warn!(error = %e, "failed to revoke session at sign-out");
        }
    }

    async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let email = validate_email(email)?;
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let verification = self
            .verifications
            .issue(&user.email, VerificationPurpose::PasswordReset)
            .await?;
        self.mail.enqueue(templates::password_reset_email(
            &self.app,
            &user.email,
            &verification.value,
            self.verifications.ttl(VerificationPurpose::PasswordReset),
        ));
        tracing::info!(user_id = %user.id, "password reset requested");
        Ok(())
    }

    async fn reset_password(&self, token: &str, new_password: String) -> Result<(), AppError> {
        let token = validate_token(token)?;
        validate_password(&new_password, &self.password_policy)?;

        let verification = self
            .verifications
            .redeem(token, VerificationPurpose::PasswordReset)
            .await
            .map_err(redeem_error)?;

        let user = self
            .store
            .find_user_by_email(&verification.identifier)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let digest = self.hasher.hash(new_password).await?;
        match self
            .store
            .complete_password_reset(&verification.id, &user.id, &digest, Utc::now())
            .await?
        {
            PasswordResetOutcome::Applied => {},
            PasswordResetOutcome::TokenAlreadyUsed => return Err(AppError::InvalidToken),
            PasswordResetOutcome::NoCredentialAccount => {
                return Err(AppError::NotFound("Credential account not found".to_string()))
            },
        }
        counter!(PASSWORD_RESET).increment(1);
        tracing::info!(user_id = %user.id, "password reset");

        // the new password is already in place
        if let Err(e) = self.sessions.revoke_all_for_user(&user.id).await {
            tracing::warn!(error = %e, user_id = %user.id, "failed to revoke sessions after password reset");
        }
        Ok(())
    }

    async fn verify_email(&self, token: Option<&str>) -> Result<(), AppError> {
        let token = validate_token(token.unwrap_or_default())?;
        let verification = self
            .verifications
            .redeem(token, VerificationPurpose::EmailVerification)
            .await
            .map_err(redeem_error)?;

        let matched = self
            .store
            .mark_email_verified(&verification.identifier, Utc::now())
            .await?;
        self.verifications.discard(&verification).await;

        if !matched {
            tracing::warn!(verification_id = %verification.id, "verification token for a deleted user");
            return Err(AppError::InvalidToken);
        }
        tracing::info!(email = %verification.identifier, "email verified");
        Ok(())
    }

    async fn resend_verification(&self, email: &str) -> Result<(), AppError> {
        let email = validate_email(email)?;
        match self.store.find_user_by_email(&email).await? {
            None => {
                tracing::debug!("verification resend requested for unknown email");
                Ok(())
            },
            Some(user) if user.email_verified => Err(AppError::AlreadyVerified),
            Some(user) => self.send_verification(&user.email).await,
        }
    }
}
