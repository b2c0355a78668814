// ============================
// crates/backend-lib/src/mailer/log.rs
// ============================
//! Development mailer that writes messages to the log.
use async_trait::async_trait;

use super::{DeliveryError, Mailer, OutgoingEmail};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            kind = ?email.kind,
            link = %email.link,
            "email not sent (log mailer)"
        );
        Ok(())
    }
}
