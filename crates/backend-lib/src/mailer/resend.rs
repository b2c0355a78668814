// ============================
// crates/backend-lib/src/mailer/resend.rs
// ============================
//! Delivery through the Resend HTTP API.
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{DeliveryError, Mailer, OutgoingEmail};
use crate::config::MailSettings;

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn from_settings(settings: &MailSettings) -> Result<Self, DeliveryError> {
        let api_key = settings
            .resend_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DeliveryError::NotConfigured("RESEND_API_KEY is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.send_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.resend_endpoint.clone(),
            api_key,
            from: settings.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let payload = ResendPayload {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status, body });
        }

        tracing::debug!(to = %email.to, kind = ?email.kind, "email accepted by resend");
        Ok(())
    }
}
