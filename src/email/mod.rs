//! Verification-code delivery.
//!
//! The issuer hands a [`VerificationEmail`] to an [`EmailSender`]; the sender
//! decides how to deliver. Production uses [`ApiEmailSender`] against a
//! transactional email API; environments without a delivery credential get
//! [`LogEmailSender`], which logs the code and reports success.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::info;

use crate::APP_USER_AGENT;

pub const DEFAULT_API_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Clone)]
pub struct VerificationEmail {
    pub to: String,
    pub code: String,
}

/// Delivery abstraction used by the OTP issuer.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver the code or return an error.
    async fn send(&self, message: &VerificationEmail) -> Result<()>;
}

/// Dev sender that logs the code instead of delivering it.
#[derive(Debug, Clone)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &VerificationEmail) -> Result<()> {
        info!(
            to = %message.to,
            code = %message.code,
            "email delivery not configured, code not sent"
        );
        Ok(())
    }
}

/// Sender backed by a transactional email HTTP API (Brevo-compatible).
#[derive(Debug)]
pub struct ApiEmailSender {
    endpoint: String,
    api_key: SecretString,
    sender_name: String,
    sender_email: String,
    client: Client,
}

impl ApiEmailSender {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        sender_name: impl Into<String>,
        sender_email: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build email HTTP client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            sender_name: sender_name.into(),
            sender_email: sender_email.into(),
            client,
        })
    }
}

#[async_trait]
impl EmailSender for ApiEmailSender {
    async fn send(&self, message: &VerificationEmail) -> Result<()> {
        let payload = json!({
            "sender": { "name": self.sender_name, "email": self.sender_email },
            "to": [{ "email": message.to }],
            "subject": "Your verification code",
            "htmlContent": format!(
                "<p>Your code is: <strong>{}</strong>. It expires in 10 minutes.</p>",
                message.code
            ),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("accept", "application/json")
            .header("api-key", self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .context("email API request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("email API returned {}", response.status()));
        }

        Ok(())
    }
}
