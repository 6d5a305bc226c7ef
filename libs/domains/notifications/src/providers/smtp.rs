//! SMTP email provider implementation using lettre.
//!
//! Mostly used for local development against Mailpit/MailHog, but works with
//! any relay when TLS and credentials are configured.

use super::{preflight, EmailProvider};
use crate::error::DeliveryError;
use crate::models::{DeliveryReceipt, RenderedMessage};
use async_trait::async_trait;
use core_config::{env_or_default, env_parse_or, ConfigError, FromEnv};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error, info};

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server host.
    pub host: String,
    /// SMTP server port.
    pub port: u16,
    /// Sender email address.
    pub from_email: String,
    /// Sender name.
    pub from_name: String,
    /// SMTP username (optional for dev servers like Mailpit).
    pub username: Option<String>,
    /// SMTP password (optional for dev servers like Mailpit).
    pub password: Option<String>,
    /// Whether to use TLS (false for local dev servers).
    pub use_tls: bool,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, port: u16, from_email: impl Into<String>, from_name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            from_email: from_email.into(),
            from_name: from_name.into(),
            username: None,
            password: None,
            use_tls: false,
        }
    }

    /// Builder method to set TLS.
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Builder method to set credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl FromEnv for SmtpConfig {
    /// Defaults target a local Mailpit on port 1025 without TLS.
    fn from_env() -> Result<Self, ConfigError> {
        let use_tls = env_or_default("SMTP_USE_TLS", "false");

        Ok(Self {
            host: env_or_default("SMTP_HOST", "localhost"),
            port: env_parse_or("SMTP_PORT", 1025)?,
            from_email: env_or_default("SMTP_FROM_EMAIL", "noreply@infinitedb.com"),
            from_name: env_or_default("SMTP_FROM_NAME", "InfiniteDb"),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            use_tls: matches!(use_tls.trim(), "true" | "1"),
        })
    }
}

/// SMTP email provider.
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Result<Self, DeliveryError> {
        let transport = Self::build_transport(&config)?;
        Ok(Self { transport, config })
    }

    fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| DeliveryError::Configuration(format!("Failed to create SMTP relay: {}", e)))?
                .port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn sender(&self) -> Result<Mailbox, DeliveryError> {
        let address = self.config.from_email.trim();
        let raw = if self.config.from_name.is_empty() {
            address.to_string()
        } else {
            format!("{} <{}>", self.config.from_name, address)
        };
        raw.parse()
            .map_err(|e| DeliveryError::Configuration(format!("Invalid sender address: {}", e)))
    }

    fn build_message(&self, message: &RenderedMessage) -> Result<Message, DeliveryError> {
        let mut builder = Message::builder().from(self.sender()?).subject(message.subject());

        for recipient in message.recipients() {
            let mailbox: Mailbox = recipient.parse().map_err(|e| {
                DeliveryError::Rejected(format!("Invalid recipient address '{}': {}", recipient, e))
            })?;
            builder = builder.to(mailbox);
        }

        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.plain_text().to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html().to_string()),
                    ),
            )
            .map_err(|e| DeliveryError::Rejected(format!("Failed to build email message: {}", e)))
    }
}

/// Whether an SMTP error text carries the given reply code as a separate number.
fn has_reply_code(detail: &str, code: &str) -> bool {
    detail
        .split(|c: char| !c.is_ascii_digit())
        .any(|segment| segment == code)
}

fn failure_for_smtp(err: lettre::transport::smtp::Error) -> DeliveryError {
    let detail = err.to_string();
    if has_reply_code(&detail, "535") || detail.to_lowercase().contains("authentication") {
        DeliveryError::Configuration(format!("SMTP authentication failed: {}", detail))
    } else if err.is_permanent() {
        DeliveryError::Rejected(format!("SMTP server refused the message: {}", err))
    } else {
        DeliveryError::Transient(format!("SMTP send failed: {}", err))
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryReceipt, DeliveryError> {
        preflight(message, &self.config.from_email)?;

        debug!(
            recipients = message.recipients().len(),
            subject = %message.subject(),
            host = %self.config.host,
            port = %self.config.port,
            "Sending email via SMTP"
        );

        let email = self.build_message(message)?;

        let response = self.transport.send(email).await.map_err(|e| {
            let failure = failure_for_smtp(e);
            error!(error = %failure, "Failed to send email via SMTP");
            failure
        })?;

        if !response.is_positive() {
            return Ok(DeliveryReceipt::incomplete());
        }

        let message_id = response.message().next().map(|s| s.to_string());
        info!(message_id = ?message_id, "Email accepted by SMTP server");

        Ok(DeliveryReceipt::completed(message_id))
    }

    fn name(&self) -> &'static str {
        "SMTP"
    }

    async fn health_check(&self) -> Result<bool, DeliveryError> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| DeliveryError::Transient(format!("SMTP health check failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(recipients: Vec<&str>) -> RenderedMessage {
        RenderedMessage::new(
            "InfiniteDb - Account Deleted",
            "plain body",
            "<p>html body</p>",
            recipients.into_iter().map(String::from).collect(),
        )
    }

    #[test]
    fn test_smtp_config_from_env_defaults() {
        temp_env::with_vars_unset(
            [
                "SMTP_HOST",
                "SMTP_PORT",
                "SMTP_FROM_EMAIL",
                "SMTP_FROM_NAME",
                "SMTP_USERNAME",
                "SMTP_PASSWORD",
                "SMTP_USE_TLS",
            ],
            || {
                let config = SmtpConfig::from_env().unwrap();
                assert_eq!(config.host, "localhost");
                assert_eq!(config.port, 1025);
                assert_eq!(config.from_email, "noreply@infinitedb.com");
                assert!(config.username.is_none());
                assert!(!config.use_tls);
            },
        );
    }

    #[test]
    fn test_smtp_config_from_env_overrides() {
        temp_env::with_vars(
            [
                ("SMTP_HOST", Some("smtp.example.com")),
                ("SMTP_PORT", Some("587")),
                ("SMTP_USE_TLS", Some("1")),
                ("SMTP_USERNAME", Some("user")),
                ("SMTP_PASSWORD", Some("pass")),
            ],
            || {
                let config = SmtpConfig::from_env().unwrap();
                assert_eq!(config.host, "smtp.example.com");
                assert_eq!(config.port, 587);
                assert!(config.use_tls);
                assert_eq!(config.username.as_deref(), Some("user"));
            },
        );
    }

    #[test]
    fn test_smtp_config_bad_port() {
        temp_env::with_var("SMTP_PORT", Some("not-a-port"), || {
            assert!(matches!(
                SmtpConfig::from_env(),
                Err(ConfigError::ParseError { .. })
            ));
        });
    }

    #[test]
    fn test_smtp_config_with_tls() {
        let config = SmtpConfig::new("smtp.gmail.com", 587, "test@gmail.com", "Test")
            .with_tls(true)
            .with_credentials("user", "pass");

        assert!(config.use_tls);
        assert_eq!(config.username, Some("user".to_string()));
        assert_eq!(config.password, Some("pass".to_string()));
    }

    #[test]
    fn test_reply_code_matching() {
        assert!(has_reply_code("permanent error (535): 5.7.8 bad credentials", "535"));
        assert!(!has_reply_code("rejected user15353@example.com", "535"));
    }

    #[tokio::test]
    async fn test_build_message_addresses_every_recipient() {
        let provider = SmtpProvider::new(SmtpConfig::new("localhost", 1025, "noreply@infinitedb.com", "InfiniteDb")).unwrap();
        let email = provider.build_message(&message(vec!["a@b.com", "c@d.com"])).unwrap();

        let formatted = String::from_utf8(email.formatted()).unwrap();
        assert!(formatted.contains("a@b.com"));
        assert!(formatted.contains("c@d.com"));
        assert!(formatted.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected() {
        let provider = SmtpProvider::new(SmtpConfig::new("localhost", 1025, "noreply@infinitedb.com", "InfiniteDb")).unwrap();
        let err = provider.build_message(&message(vec!["not an address"])).unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_invalid_sender_is_configuration() {
        let provider = SmtpProvider::new(SmtpConfig::new("localhost", 1025, "broken", "InfiniteDb")).unwrap();
        let err = provider.build_message(&message(vec!["a@b.com"])).unwrap_err();
        assert!(matches!(err, DeliveryError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_blank_sender_fails_before_network() {
        let provider = SmtpProvider::new(SmtpConfig::new("localhost", 1, "", "InfiniteDb")).unwrap();
        let err = provider.send(&message(vec!["a@b.com"])).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Configuration(_)));
    }
}
