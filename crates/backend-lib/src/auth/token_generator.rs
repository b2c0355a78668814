// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
//! Random values handed out by the server: session tokens, emailed
//! verification tokens and row ids.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use uuid::Uuid;

/// 256 bits of entropy
const TOKEN_BYTES: usize = 32;

/// Opaque bearer token, safe to put in a cookie or a query string
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(TOKEN_BYTES)
}

/// Same as [`generate_secure_token`] with `bytes` of entropy
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

/// Fresh primary key for a stored row
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
