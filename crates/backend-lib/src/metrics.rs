// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const SIGN_UP: &str = "auth.sign_up";
pub const SIGN_IN: &str = "auth.sign_in";
pub const SIGN_IN_FAILED: &str = "auth.sign_in.failed";
pub const SIGN_IN_LOCKED_OUT: &str = "auth.sign_in.locked_out";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_REVOKED: &str = "session.revoked";
pub const VERIFICATION_ISSUED: &str = "verification.issued";
pub const VERIFICATION_REDEEMED: &str = "verification.redeemed";
pub const VERIFICATION_REJECTED: &str = "verification.rejected";
pub const PASSWORD_RESET: &str = "auth.password_reset";
pub const MAIL_QUEUED: &str = "mail.queued";
pub const MAIL_DROPPED: &str = "mail.dropped";
pub const MAIL_SENT: &str = "mail.sent";
pub const MAIL_FAILED: &str = "mail.failed";
