use reqwest::Client;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::errors::MailError;

pub const WELCOME_SUBJECT: &str = "You’re on the OvaHead list";

pub const WELCOME_HTML: &str = r#"<div style="font-family: ui-sans-serif, system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial; line-height:1.5;">
  <p style="margin:0 0 12px 0;">You’re on the list.</p>
  <p style="margin:0 0 12px 0;">We’ll email you when OvaHead is ready.</p>
  <p style="margin:0; color:#666; font-size:12px;">If you didn’t sign up, you can ignore this email.</p>
</div>"#;

/// Body accepted by the provider's send endpoint.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Sends the welcome email through an HTTP email API.
///
/// One POST per call, no retries. Without an API key every send is a no-op.
#[derive(Clone)]
pub struct WelcomeMailer {
    client: Client,
    api_key: Option<String>,
    from: String,
    endpoint: String,
}

impl WelcomeMailer {
    pub fn new(cfg: &EmailConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: cfg.api_key.clone(),
            from: cfg.from_address().to_string(),
            endpoint: cfg.endpoint().to_string(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(&EmailConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn send(&self, to: &str) -> Result<(), MailError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(());
        };

        let body = SendRequest {
            from: &self.from,
            to,
            subject: WELCOME_SUBJECT,
            html: WELCOME_HTML,
        };

        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(MailError::Rejected(res.status()));
        }

        tracing::debug!("Welcome email accepted for delivery");
        Ok(())
    }
}
