// Signup notifications delivered through SendGrid.
//
// The API key is read from the environment on every send so a key added
// after startup is picked up without a restart.

use crate::geolocation::Geolocation;
use crate::models::BoxFuture;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt;
use tracing::{debug, error, info, warn};

pub const API_KEY_VAR: &str = "SENDGRID_API_KEY";
const API_KEY_PREFIX: &str = "SG.";

// Everything known about a signup when the notification goes out.
#[derive(Debug, Clone, PartialEq)]
pub struct SignupNotification {
    pub email: String,
    pub timestamp: String,
    pub ip_address: Option<String>,
    pub geolocation: Option<Geolocation>,
}

// What happened to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    // No usable API key, nothing was sent
    NotConfigured,
    // The provider answered with a non-success status
    Rejected { status: u16 },
    // Transport error or similar
    Failed(String),
}

impl NotifyOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered)
    }

    // Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            NotifyOutcome::Delivered => "delivered",
            NotifyOutcome::NotConfigured => "not_configured",
            NotifyOutcome::Rejected { .. } => "rejected",
            NotifyOutcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyOutcome::Delivered => write!(f, "delivered"),
            NotifyOutcome::NotConfigured => write!(f, "mail provider not configured"),
            NotifyOutcome::Rejected { status } => write!(f, "rejected with status {status}"),
            NotifyOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

pub trait Notifier: Send + Sync {
    // Deliver a notification. Must not panic; failures are reported through
    // the returned outcome.
    fn notify<'a>(&'a self, signup: &'a SignupNotification) -> BoxFuture<'a, NotifyOutcome>;
}

// A rendered email.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

// Current API key from the environment, trimmed. `None` when unset or blank.
pub fn api_key() -> Option<String> {
    std::env::var(API_KEY_VAR)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

// First characters of the key, safe to show in service metadata.
pub fn key_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(5).collect();
    format!("{prefix}...")
}

fn format_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(time) => time
            .with_timezone(&Utc)
            .format("%A, %B %-d, %Y at %H:%M:%S UTC")
            .to_string(),
        Err(_) => timestamp.to_string(),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// Render the notification. Optional details that are missing are left out
// entirely.
pub fn compose_message(
    signup: &SignupNotification,
    from: &str,
    to: &str,
    site_name: &str,
) -> MailMessage {
    let time = format_time(&signup.timestamp);
    let location = signup
        .geolocation
        .as_ref()
        .map(|geo| geo.place().unwrap_or_else(|| "Unavailable".to_string()));
    let timezone = signup
        .geolocation
        .as_ref()
        .and_then(|geo| geo.timezone.as_deref());

    let mut text_lines = vec![
        "New waitlist signup received!".to_string(),
        String::new(),
        format!("Email: {}", signup.email),
        format!("Time: {time}"),
    ];
    if let Some(ip) = &signup.ip_address {
        text_lines.push(format!("IP address: {ip}"));
    }
    if let Some(location) = &location {
        text_lines.push(format!("Location: {location}"));
    }
    text_lines.push(String::new());
    text_lines.push("---".to_string());
    text_lines.push(site_name.to_string());

    let email = escape_html(&signup.email);
    let row = |label: &str, value: &str| {
        format!(
            r#"<p style="margin: 10px 0; color: #2D2D2D;"><strong>{label}:</strong> {value}</p>"#
        )
    };

    let mut rows = vec![
        row(
            "Email",
            &format!(r#"<a href="mailto:{email}" style="color: #0057FF; text-decoration: none;">{email}</a>"#),
        ),
        row("Time", &escape_html(&time)),
    ];
    if let Some(ip) = &signup.ip_address {
        rows.push(row("IP address", &escape_html(ip)));
    }
    if let Some(location) = &location {
        rows.push(row("Location", &escape_html(location)));
    }
    if let Some(timezone) = timezone {
        rows.push(row("Timezone", &escape_html(timezone)));
    }

    let site = escape_html(site_name);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="margin: 0; padding: 0; background-color: #ffffff;">
  <div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #C89B5D; font-size: 36px; margin: 0 0 10px 0;">{site}</h1>
    <h2 style="color: #2D2D2D; font-size: 24px; margin-bottom: 20px; font-weight: 600;">New Waitlist Signup</h2>
    <div style="background-color: #F5F5F5; border-left: 4px solid #C89B5D; padding: 20px; margin: 20px 0;">
      {rows}
    </div>
    <p style="color: #666; font-size: 14px; margin-top: 30px; line-height: 1.5;">Sent by the {site} waitlist service.</p>
  </div>
</body>
</html>"#,
        rows = rows.join("\n      "),
    );

    MailMessage {
        to: to.to_string(),
        from: from.to_string(),
        subject: format!("New waitlist signup - {site_name}"),
        text: text_lines.join("\n"),
        html,
    }
}

// Sends notifications through the SendGrid v3 mail API.
pub struct SendGridNotifier {
    client: reqwest::Client,
    base_url: String,
    from: String,
    to: String,
    site_name: String,
}

impl SendGridNotifier {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        site_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            from: from.into(),
            to: to.into(),
            site_name: site_name.into(),
        }
    }

    async fn send(&self, api_key: Option<String>, signup: &SignupNotification) -> NotifyOutcome {
        let Some(api_key) = api_key else {
            error!(var = API_KEY_VAR, "SendGrid API key not set, cannot send notification");
            return NotifyOutcome::NotConfigured;
        };
        if !api_key.starts_with(API_KEY_PREFIX) {
            error!("SendGrid API key format appears invalid (should start with SG.)");
            return NotifyOutcome::NotConfigured;
        }

        let msg = compose_message(signup, &self.from, &self.to, &self.site_name);
        let payload = json!({
            "personalizations": [{ "to": [{ "email": msg.to }] }],
            "from": { "email": msg.from },
            "subject": msg.subject,
            "content": [
                { "type": "text/plain", "value": msg.text },
                { "type": "text/html", "value": msg.html },
            ],
        });

        debug!(from = %msg.from, to = %msg.to, "Sending signup notification");

        let result = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(res) if res.status().is_success() => {
                info!(to = %msg.to, "Signup notification sent");
                NotifyOutcome::Delivered
            }
            Ok(res) => {
                let status = res.status().as_u16();
                let body = res.text().await.unwrap_or_default();
                match status {
                    401 => warn!(status, "SendGrid rejected the API key"),
                    403 => warn!(status, "SendGrid API key lacks permission or sender is unverified"),
                    _ => {}
                }
                error!(status, %body, "SendGrid rejected the notification");
                NotifyOutcome::Rejected { status }
            }
            Err(e) => {
                error!(error = %e, "SendGrid request failed");
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }
}

impl Notifier for SendGridNotifier {
    fn notify<'a>(&'a self, signup: &'a SignupNotification) -> BoxFuture<'a, NotifyOutcome> {
        Box::pin(self.send(api_key(), signup))
    }
}
