// ============================
// crates/backend-lib/src/mailer/queue.rs
// ============================
//! Background mail delivery.
//!
//! Requests hand messages to [`MailQueue`] and return immediately; a single
//! worker task owns the transport and retries failed deliveries with
//! exponential backoff.
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::{DeliveryError, Mailer, OutgoingEmail};
use crate::config::MailSettings;
use crate::metrics::{MAIL_DROPPED, MAIL_FAILED, MAIL_QUEUED, MAIL_SENT};

/// Handle kept by request handlers
#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::Sender<OutgoingEmail>,
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`
    fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

struct MailWorker {
    mailer: Arc<dyn Mailer>,
    policy: RetryPolicy,
}

impl MailQueue {
    /// Spawn the delivery worker. It stops once every handle is dropped and
    /// the backlog is drained.
    pub fn start(mailer: Arc<dyn Mailer>, settings: &MailSettings) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let worker = MailWorker {
            mailer,
            policy: RetryPolicy {
                max_attempts: settings.max_attempts.max(1),
                backoff: Duration::from_millis(settings.retry_backoff_ms),
                attempt_timeout: Duration::from_secs(settings.send_timeout_secs),
            },
        };
        let handle = tokio::spawn(worker.run(rx));
        (Self { tx }, handle)
    }

    /// Queue a message without waiting. Returns false when it was dropped.
    pub fn enqueue(&self, email: OutgoingEmail) -> bool {
        match self.tx.try_send(email) {
            Ok(()) => {
                counter!(MAIL_QUEUED).increment(1);
                true
            },
            Err(TrySendError::Full(email)) => {
                counter!(MAIL_DROPPED).increment(1);
                tracing::warn!(to = %email.to, kind = ?email.kind, "mail queue full, message dropped");
                false
            },
            Err(TrySendError::Closed(email)) => {
                counter!(MAIL_DROPPED).increment(1);
                tracing::error!(to = %email.to, kind = ?email.kind, "mail worker stopped, message dropped");
                false
            },
        }
    }
}

impl MailWorker {
    async fn run(self, mut rx: mpsc::Receiver<OutgoingEmail>) {
        tracing::info!(transport = self.mailer.name(), "mail worker started");
        while let Some(email) = rx.recv().await {
            self.deliver(email).await;
        }
        tracing::info!("mail worker stopped");
    }

    async fn deliver(&self, email: OutgoingEmail) {
        for attempt in 1..=self.policy.max_attempts {
            let outcome = tokio::time::timeout(self.policy.attempt_timeout, self.mailer.send(&email))
                .await
                .unwrap_or(Err(DeliveryError::TimedOut));

            match outcome {
                Ok(()) => {
                    counter!(MAIL_SENT).increment(1);
                    tracing::info!(to = %email.to, kind = ?email.kind, attempt, "email delivered");
                    return;
                },
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        error = %e,
                        to = %email.to,
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "email delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(e) => {
                    counter!(MAIL_FAILED).increment(1);
                    tracing::error!(
                        error = %e,
                        to = %email.to,
                        kind = ?email.kind,
                        attempts = attempt,
                        "email delivery abandoned"
                    );
                },
            }
        }
    }
}
