// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.
use std::net::IpAddr;

pub mod cookie;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod token_generator;
pub mod verification;
mod service;
mod service_impl;

pub use password::{verify_password, PasswordHasher};
pub use rate_limit::AuthRateLimiter;
pub use service::AuthService;
pub use service_impl::DefaultAuth;
pub use session::SessionManager;
pub use verification::{RedeemError, VerificationManager};

/// Where a request came from, recorded on new sessions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}
