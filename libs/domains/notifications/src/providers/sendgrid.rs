//! SendGrid email provider implementation.

use super::{preflight, EmailProvider};
use crate::error::DeliveryError;
use crate::models::{DeliveryReceipt, RenderedMessage};
use async_trait::async_trait;
use core_config::{env_or_default, env_required, ConfigError, FromEnv};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "https://api.sendgrid.com/v3";

/// SendGrid API configuration.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    /// SendGrid API key.
    pub api_key: String,
    /// Sender email address.
    pub from_email: String,
    /// Sender name.
    pub from_name: String,
    /// SendGrid API base URL (defaults to production).
    pub api_url: String,
}

impl SendGridConfig {
    pub fn new(api_key: impl Into<String>, from_email: impl Into<String>, from_name: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            from_email: from_email.into(),
            from_name: from_name.into(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

impl FromEnv for SendGridConfig {
    /// Reads SENDGRID_API_KEY and SENDGRID_FROM_EMAIL (required), SENDGRID_FROM_NAME and SENDGRID_API_URL.
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_required("SENDGRID_API_KEY")?;
        let from_email = env_required("SENDGRID_FROM_EMAIL")?;
        let from_name = env_or_default("SENDGRID_FROM_NAME", "InfiniteDb");
        let api_url = env_or_default("SENDGRID_API_URL", DEFAULT_API_URL);

        Ok(Self::new(api_key, from_email, from_name).with_api_url(api_url))
    }
}

/// SendGrid email provider.
pub struct SendGridProvider {
    config: SendGridConfig,
    client: Client,
}

impl SendGridProvider {
    pub fn new(config: SendGridConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(SendGridConfig::from_env()?))
    }

    fn build_request(&self, message: &RenderedMessage) -> SendGridRequest {
        // One personalization per recipient so addresses never see each other.
        let personalizations = message
            .recipients()
            .iter()
            .map(|recipient| Personalization {
                to: vec![EmailAddress {
                    email: recipient.clone(),
                    name: None,
                }],
            })
            .collect();

        SendGridRequest {
            personalizations,
            from: EmailAddress {
                email: self.config.from_email.trim().to_string(),
                name: Some(self.config.from_name.clone()).filter(|n| !n.is_empty()),
            },
            subject: message.subject().to_string(),
            content: vec![
                Content {
                    content_type: "text/plain".to_string(),
                    value: message.plain_text().to_string(),
                },
                Content {
                    content_type: "text/html".to_string(),
                    value: message.html().to_string(),
                },
            ],
        }
    }
}

// SendGrid API request/response structures

#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SendGridError {
    errors: Vec<SendGridErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct SendGridErrorDetail {
    message: String,
}

/// Map a non-success SendGrid status to a delivery error.
fn failure_for_status(status: StatusCode, detail: String) -> DeliveryError {
    let detail = format!("SendGrid error ({}): {}", status, detail);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DeliveryError::Configuration(detail),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => DeliveryError::Transient(detail),
        s if s.is_server_error() => DeliveryError::Transient(detail),
        s if s.is_client_error() => DeliveryError::Rejected(detail),
        _ => DeliveryError::Transient(detail),
    }
}

fn failure_for_transport(err: reqwest::Error) -> DeliveryError {
    if err.is_builder() {
        DeliveryError::Configuration(format!("invalid SendGrid request: {}", err))
    } else {
        DeliveryError::Transient(format!("SendGrid request failed: {}", err))
    }
}

/// Pull the human-readable messages out of a SendGrid error body.
fn error_detail(body: String) -> String {
    match serde_json::from_str::<SendGridError>(&body) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join(", "),
        _ => body,
    }
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryReceipt, DeliveryError> {
        preflight(message, &self.config.from_email)?;

        let request = self.build_request(message);

        debug!(
            recipients = message.recipients().len(),
            subject = %message.subject(),
            "Sending email via SendGrid"
        );

        let response = self
            .client
            .post(format!("{}/mail/send", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(failure_for_transport)?;

        let status = response.status();
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if status.is_success() {
            info!(message_id = ?message_id, "Email accepted by SendGrid");
            return Ok(DeliveryReceipt::completed(message_id));
        }

        let body = response.text().await.unwrap_or_default();
        let failure = failure_for_status(status, error_detail(body));
        error!(status = %status, error = %failure, "SendGrid refused the email");
        Err(failure)
    }

    fn name(&self) -> &'static str {
        "SendGrid"
    }

    async fn health_check(&self) -> Result<bool, DeliveryError> {
        // No dedicated health endpoint; check the key format instead.
        if self.config.api_key.starts_with("SG.") {
            Ok(true)
        } else {
            Err(DeliveryError::Configuration(
                "Invalid SendGrid API key format".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(from_email: &str) -> SendGridProvider {
        SendGridProvider::new(
            SendGridConfig::new("SG.test_key", from_email, "InfiniteDb")
                .with_api_url("http://127.0.0.1:9"),
        )
    }

    fn message() -> RenderedMessage {
        RenderedMessage::new(
            "Welcome to InfiniteDb!",
            "plain body",
            "<p>html body</p>",
            vec!["a@b.com".to_string()],
        )
    }

    #[test]
    fn test_sendgrid_config_new() {
        let config = SendGridConfig::new("SG.test_key", "test@example.com", "Test Sender");

        assert_eq!(config.api_key, "SG.test_key");
        assert_eq!(config.from_email, "test@example.com");
        assert_eq!(config.from_name, "Test Sender");
        assert_eq!(config.api_url, "https://api.sendgrid.com/v3");
    }

    #[test]
    fn test_sendgrid_config_from_env() {
        temp_env::with_vars(
            [
                ("SENDGRID_API_KEY", Some("SG.key")),
                ("SENDGRID_FROM_EMAIL", Some("noreply@infinitedb.com")),
                ("SENDGRID_FROM_NAME", None),
                ("SENDGRID_API_URL", Some("http://localhost:3030/v3")),
            ],
            || {
                let config = SendGridConfig::from_env().unwrap();
                assert_eq!(config.from_email, "noreply@infinitedb.com");
                assert_eq!(config.from_name, "InfiniteDb");
                assert_eq!(config.api_url, "http://localhost:3030/v3");
            },
        );
    }

    #[test]
    fn test_sendgrid_config_requires_sender() {
        temp_env::with_vars(
            [
                ("SENDGRID_API_KEY", Some("SG.key")),
                ("SENDGRID_FROM_EMAIL", None),
            ],
            || {
                let err = SendGridConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("SENDGRID_FROM_EMAIL"));
            },
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(provider("noreply@infinitedb.com").build_request(&message())).unwrap();

        assert_eq!(body["personalizations"][0]["to"][0]["email"], "a@b.com");
        assert!(body["personalizations"][0]["to"][0].get("name").is_none());
        assert_eq!(body["from"]["email"], "noreply@infinitedb.com");
        assert_eq!(body["subject"], "Welcome to InfiniteDb!");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][1]["type"], "text/html");
        assert_eq!(body["content"][1]["value"], "<p>html body</p>");
    }

    #[test]
    fn test_status_mapping() {
        let map = |code: u16| failure_for_status(StatusCode::from_u16(code).unwrap(), String::new());

        assert!(matches!(map(400), DeliveryError::Rejected(_)));
        assert!(matches!(map(413), DeliveryError::Rejected(_)));
        assert!(matches!(map(401), DeliveryError::Configuration(_)));
        assert!(matches!(map(403), DeliveryError::Configuration(_)));
        assert!(matches!(map(429), DeliveryError::Transient(_)));
        assert!(matches!(map(500), DeliveryError::Transient(_)));
        assert!(matches!(map(503), DeliveryError::Transient(_)));
    }

    #[test]
    fn test_error_detail_parsing() {
        let body = r#"{"errors":[{"message":"bad to","field":"personalizations.0.to"},{"message":"bad subject"}]}"#;
        assert_eq!(error_detail(body.to_string()), "bad to, bad subject");
        assert_eq!(error_detail("plain failure".to_string()), "plain failure");
    }

    #[tokio::test]
    async fn test_blank_sender_fails_before_network() {
        let err = provider("   ").send(&message()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_health_check_key_format() {
        assert!(provider("noreply@infinitedb.com").health_check().await.unwrap());

        let bad = SendGridProvider::new(SendGridConfig::new("nope", "noreply@infinitedb.com", "x"));
        assert!(matches!(
            bad.health_check().await,
            Err(DeliveryError::Configuration(_))
        ));
    }
}
