// ============================
// crates/backend-lib/src/mailer/mod.rs
// ============================
//! Outgoing mail: the transport trait, its implementations and the
//! background delivery queue.
pub mod log;
pub mod memory;
pub mod queue;
pub mod resend;
pub mod templates;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{MailProvider, MailSettings};

pub use self::log::LogMailer;
pub use self::memory::RecordingMailer;
pub use self::queue::MailQueue;
pub use self::resend::ResendMailer;

/// What an email is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
}

/// A rendered message ready for delivery
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub kind: EmailKind,
    /// The action link embedded in the body
    pub link: String,
}

/// Mail delivery failures. Only ever logged.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("mailer not configured: {0}")]
    NotConfigured(String),

    #[error("delivery attempt timed out")]
    TimedOut,
}

/// A way of delivering email
#[async_trait]
pub trait Mailer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError>;
}

/// Build the transport named by the settings
pub fn from_settings(settings: &MailSettings) -> Result<Arc<dyn Mailer>, DeliveryError> {
    match settings.provider {
        MailProvider::Log => Ok(Arc::new(LogMailer)),
        MailProvider::Resend => Ok(Arc::new(ResendMailer::from_settings(settings)?)),
    }
}
