// ============================
// crates/backend-lib/src/mailer/memory.rs
// ============================
//! Mailer that keeps every message in memory, for tests and local tooling.
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{DeliveryError, EmailKind, Mailer, OutgoingEmail};

#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    /// Number of upcoming sends that fail before one succeeds
    failures_left: Arc<AtomicU32>,
    delivered: Arc<Notify>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` deliveries
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }

    /// Most recent message of `kind` sent to `to`
    pub async fn last_to(&self, to: &str, kind: EmailKind) -> Option<OutgoingEmail> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|email| email.to == to && email.kind == kind)
            .cloned()
    }

    /// Wait until at least `count` messages were delivered
    pub async fn wait_for(&self, count: usize) {
        loop {
            let notified = self.delivered.notified();
            if self.sent.lock().await.len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(DeliveryError::Rejected {
                status: 503,
                body: "injected failure".to_string(),
            });
        }

        self.sent.lock().await.push(email.clone());
        self.delivered.notify_waiters();
        Ok(())
    }
}
