// ============================
// backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    value::Uncased,
    Figment,
};
use serde::{Deserialize, Serialize};

/// Prefix of the layered environment variables, e.g. `AUTH_SERVER__PORT`.
pub const ENV_PREFIX: &str = "AUTH_";

/// Variables the previous deployment read directly from the environment.
const LEGACY_ENV_KEYS: [&str; 4] = ["database_url", "app_url", "resend_api_key", "port"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Upper bound for any configured lifetime (ten years)
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub app: AppSettings,
    pub session: SessionSettings,
    pub verification: VerificationSettings,
    pub password: PasswordSettings,
    pub mail: MailSettings,
    pub rate_limit: RateLimitSettings,
    pub log: LogSettings,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single request, store and hashing included
    pub request_timeout_secs: u64,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    /// Only enable behind a proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 30,
            trust_forwarded_headers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Postgres connection string
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Apply embedded migrations when the server starts
    pub run_migrations: bool,
    /// Disable the prepared statement cache (pgbouncer / transaction poolers)
    pub pgbouncer_compat: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            acquire_timeout_secs: 5,
            run_migrations: false,
            pgbouncer_compat: false,
        }
    }
}

/// Public application (front-end) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Base URL used for links embedded in emails
    pub base_url: String,
    /// Product name shown in email subjects
    pub name: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_string(),
            name: "ViralCuts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Session lifetime, also the cookie max-age
    pub ttl_secs: u64,
    /// Set the `Secure` attribute on the session cookie
    pub cookie_secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 24 * 60 * 60, // 30 days
            cookie_secure: false,
        }
    }
}

/// Lifetime as a chrono span, clamped to [`MAX_TTL_SECS`]
pub fn ttl_span(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    pub email_ttl_secs: u64,
    pub password_reset_ttl_secs: u64,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            email_ttl_secs: 24 * 60 * 60,
            password_reset_ttl_secs: 60 * 60,
        }
    }
}

/// Which algorithm new password hashes use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Scrypt,
    Argon2,
}

/// Password policy and hashing cost
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
    pub algorithm: HashAlgorithm,
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
    pub argon2_m_cost: u32,
    pub argon2_t_cost: u32,
    pub argon2_p_cost: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 128,
            require_uppercase: false,
            require_lowercase: false,
            require_digit: false,
            require_special: false,
            algorithm: HashAlgorithm::Scrypt,
            scrypt_log_n: 15,
            scrypt_r: 8,
            scrypt_p: 1,
            argon2_m_cost: 19 * 1024,
            argon2_t_cost: 2,
            argon2_p_cost: 1,
        }
    }
}

impl PasswordSettings {
    /// Cheapest parameters the hashers accept. Only meant for tests.
    pub fn fast_for_tests() -> Self {
        Self {
            scrypt_log_n: 4,
            argon2_m_cost: 8,
            argon2_t_cost: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    /// Write emails to the log instead of sending them
    Log,
    /// Resend HTTP API
    Resend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub provider: MailProvider,
    pub resend_api_key: Option<String>,
    pub resend_endpoint: String,
    pub from: String,
    /// Delivery attempts per message before giving up
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub queue_capacity: usize,
    /// Timeout of one delivery attempt
    pub send_timeout_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            provider: MailProvider::Log,
            resend_api_key: None,
            resend_endpoint: "https://api.resend.com/emails".to_string(),
            from: "ViralCuts <noreply@viralcuts.com>".to_string(),
            max_attempts: 3,
            retry_backoff_ms: 500,
            queue_capacity: 256,
            send_timeout_secs: 10,
        }
    }
}

/// Sign-in lockout after repeated failures from one address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_failed_attempts: u32,
    pub lockout_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment("config.toml"))
    }

    /// Load settings from an explicit config file and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            bail!("config file {} does not exist", path.as_ref().display());
        }
        Self::from_figment(Self::figment(path))
    }

    /// Layering: defaults, TOML file, `AUTH_*` variables, legacy variables.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&LEGACY_ENV_KEYS).map(legacy_key))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            bail!("invalid log level: {}", self.log.level);
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be greater than zero");
        }
        if self.session.ttl_secs == 0 {
            bail!("session.ttl_secs must be greater than zero");
        }
        if self.verification.email_ttl_secs == 0 || self.verification.password_reset_ttl_secs == 0 {
            bail!("verification ttls must be greater than zero");
        }
        if [
            self.session.ttl_secs,
            self.verification.email_ttl_secs,
            self.verification.password_reset_ttl_secs,
        ]
        .iter()
        .any(|ttl| *ttl > MAX_TTL_SECS)
        {
            bail!("ttls must not exceed {MAX_TTL_SECS} seconds");
        }
        if self.password.min_length < 6 {
            bail!("password.min_length must be at least 6");
        }
        if self.password.max_length < self.password.min_length {
            bail!("password.max_length must not be below password.min_length");
        }
        if self.app.base_url.trim().is_empty() {
            bail!("app.base_url must not be empty");
        }
        if self.mail.max_attempts == 0 || self.mail.queue_capacity == 0 {
            bail!("mail.max_attempts and mail.queue_capacity must be greater than zero");
        }
        if self.mail.provider == MailProvider::Resend
            && self.mail.resend_api_key.as_deref().map_or(true, str::is_empty)
        {
            bail!("mail.resend_api_key is required when mail.provider = \"resend\"");
        }
        if self.rate_limit.max_failed_attempts == 0 {
            bail!("rate_limit.max_failed_attempts must be greater than zero");
        }
        Ok(())
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }
}

fn legacy_key(key: &figment::value::UncasedStr) -> Uncased<'_> {
    match key.as_str() {
        "database_url" => "database.url".into(),
        "app_url" => "app.base_url".into(),
        "resend_api_key" => "mail.resend_api_key".into(),
        "port" => "server.port".into(),
        _ => key.into(),
    }
}
