// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.
pub mod auth;
pub mod extract;
pub mod health;

pub use extract::SessionToken;
