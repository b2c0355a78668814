// ============================
// crates/backend-lib/src/mailer/templates.rs
// ============================
//! Bodies of the verification and password reset emails.
use chrono::Duration;

use super::{EmailKind, OutgoingEmail};
use crate::config::AppSettings;

pub fn verification_link(app: &AppSettings, token: &str) -> String {
    format!("{}/verify-email?token={token}", app.base_url.trim_end_matches('/'))
}

pub fn reset_link(app: &AppSettings, token: &str) -> String {
    format!("{}/reset-password?token={token}", app.base_url.trim_end_matches('/'))
}

pub fn verification_email(
    app: &AppSettings,
    to: &str,
    token: &str,
    ttl: Duration,
) -> OutgoingEmail {
    let link = verification_link(app, token);
    let text = format!(
        "Thanks for signing up. Confirm your address to finish setting up your account. \
         The link expires in {}.",
        describe_ttl(ttl)
    );
    let html = layout(
        &app.name,
        "Confirm your email address",
        &text,
        "Verify email",
        &link,
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Verify your email - {}", app.name),
        html,
        kind: EmailKind::Verification,
        link,
    }
}

pub fn password_reset_email(
    app: &AppSettings,
    to: &str,
    token: &str,
    ttl: Duration,
) -> OutgoingEmail {
    let link = reset_link(app, token);
    let text = format!(
        "Someone asked to reset the password of this account. If it was you, choose a new \
         password below. The link expires in {}; otherwise ignore this email.",
        describe_ttl(ttl)
    );
    let html = layout(
        &app.name,
        "Reset your password",
        &text,
        "Reset password",
        &link,
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Password reset - {}", app.name),
        html,
        kind: EmailKind::PasswordReset,
        link,
    }
}

/// Largest whole unit of a token lifetime, e.g. "24 hours" or "90 seconds"
fn describe_ttl(ttl: Duration) -> String {
    let secs = ttl.num_seconds().max(0);
    let (count, unit) = match secs {
        s if s >= 86_400 && s % 86_400 == 0 => (s / 86_400, "day"),
        s if s >= 3_600 && s % 3_600 == 0 => (s / 3_600, "hour"),
        s if s >= 60 && s % 60 == 0 => (s / 60, "minute"),
        s => (s, "second"),
    };
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

fn layout(product: &str, heading: &str, text: &str, action: &str, link: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #1f2933;">
    <h2>{heading}</h2>
    <p>{text}</p>
    <p><a href="{link}" style="padding: 10px 18px; background: #6d28d9; color: #ffffff; text-decoration: none; border-radius: 6px;">{action}</a></p>
    <p style="font-size: 12px; color: #7b8794;">Or paste this link into your browser: {link}</p>
    <p style="font-size: 12px; color: #7b8794;">{product}</p>
  </body>
</html>"#
    )
}
