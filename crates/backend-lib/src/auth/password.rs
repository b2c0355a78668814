// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use std::sync::Arc;

use anyhow::{anyhow, Context};
use argon2::{Algorithm, Argon2, Params as Argon2Params, Version};
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, SaltString},
    Params as ScryptParams, Scrypt,
};
use zeroize::Zeroize;

use crate::auth::token_generator::generate_secure_token;
use crate::config::{HashAlgorithm, PasswordSettings};

/// Derived key length for scrypt digests
const SCRYPT_OUTPUT_LEN: usize = 32;

/// Hashes passwords with the configured algorithm and verifies digests of
/// any supported algorithm.
///
/// Work runs on the blocking pool; plaintexts are zeroized once consumed.
#[derive(Clone)]
pub struct PasswordHasher {
    inner: Arc<HasherInner>,
}

struct HasherInner {
    algorithm: HashAlgorithm,
    scrypt: ScryptParams,
    argon2: Argon2Params,
    /// Digest verified against when no credential exists
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(settings: &PasswordSettings) -> anyhow::Result<Self> {
        let scrypt = ScryptParams::new(
            settings.scrypt_log_n,
            settings.scrypt_r,
            settings.scrypt_p,
            SCRYPT_OUTPUT_LEN,
        )
        .map_err(|e| anyhow!("invalid scrypt parameters: {e}"))?;
        let argon2 = Argon2Params::new(
            settings.argon2_m_cost,
            settings.argon2_t_cost,
            settings.argon2_p_cost,
            None,
        )
        .map_err(|e| anyhow!("invalid argon2 parameters: {e}"))?;

        let mut inner = HasherInner {
            algorithm: settings.algorithm,
            scrypt,
            argon2,
            dummy_hash: String::new(),
        };
        inner.dummy_hash = inner
            .hash(&generate_secure_token())
            .context("failed to prepare dummy digest")?;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Hash a new password
    pub async fn hash(&self, mut plain: String) -> anyhow::Result<String> {
        let inner = Arc::clone(&self.inner);
        let digest = tokio::task::spawn_blocking(move || {
            let digest = inner.hash(&plain);
            plain.zeroize();
            digest
        })
        .await??;
        Ok(digest)
    }

    /// Check a plaintext against a stored digest
    pub async fn verify(&self, digest: String, mut plain: String) -> bool {
        let outcome = tokio::task::spawn_blocking(move || {
            let ok = verify_password(&digest, &plain);
            plain.zeroize();
            ok
        })
        .await;

        outcome.unwrap_or_else(|e| {
            tracing::error!(error = %e, "password verification task failed");
            false
        })
    }

    /// Spend the cost of one verification without a real credential
    pub async fn dummy_verify(&self, plain: String) {
        let digest = self.inner.dummy_hash.clone();
        let _ = self.verify(digest, plain).await;
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.inner.algorithm
    }
}

impl HasherInner {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = match self.algorithm {
            HashAlgorithm::Scrypt => Scrypt
                .hash_password_customized(plain.as_bytes(), None, None, self.scrypt, &salt)
                .map_err(|e| anyhow!("scrypt hashing failed: {e}"))?
                .to_string(),
            HashAlgorithm::Argon2 => {
                Argon2::new(Algorithm::Argon2id, Version::V0x13, self.argon2.clone())
                    .hash_password(plain.as_bytes(), &salt)
                    .map_err(|e| anyhow!("argon2 hashing failed: {e}"))?
                    .to_string()
            },
        };
        Ok(digest)
    }
}

/// Verify a password against a digest.
///
/// Accepts scrypt and argon2 PHC strings plus bcrypt digests carried over
/// from older rows. Malformed digests never match.
pub fn verify_password(digest: &str, plain: &str) -> bool {
    if is_bcrypt(digest) {
        return bcrypt::verify(plain, digest).unwrap_or(false);
    }

    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    parsed
        .verify_password(&[&Scrypt, &Argon2::default()], plain.as_bytes())
        .is_ok()
}

fn is_bcrypt(digest: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"]
        .iter()
        .any(|prefix| digest.starts_with(prefix))
}
