//! Delivery gateways.
//!
//! Every gateway takes a [`RenderedMessage`] and reports either a
//! [`DeliveryReceipt`] or a classified [`DeliveryError`], so the dispatcher
//! can decide between ack, retry and stop without knowing the provider.

mod memory;
mod sendgrid;
mod smtp;

pub use memory::{InMemoryProvider, ScriptedResult};
pub use sendgrid::{SendGridConfig, SendGridProvider};
pub use smtp::{SmtpConfig, SmtpProvider};

use crate::error::DeliveryError;
use crate::models::{DeliveryReceipt, RenderedMessage};
use async_trait::async_trait;

/// Trait for email sending providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send one rendered message to all of its recipients.
    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryReceipt, DeliveryError>;

    /// Get the provider name for logging.
    fn name(&self) -> &'static str;

    /// Check if the provider is healthy/configured.
    async fn health_check(&self) -> Result<bool, DeliveryError>;
}

/// Shared pre-flight checks run by every adapter before touching the network.
pub(crate) fn preflight(message: &RenderedMessage, from_email: &str) -> Result<(), DeliveryError> {
    if from_email.trim().is_empty() {
        return Err(DeliveryError::Configuration("sender address is not configured".to_string()));
    }
    if message.recipients().is_empty() {
        return Err(DeliveryError::Rejected("message has no recipients".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(recipients: Vec<String>) -> RenderedMessage {
        RenderedMessage::new("subject", "text", "<p>html</p>", recipients)
    }

    #[test]
    fn test_preflight_blank_sender_is_configuration() {
        let err = preflight(&message(vec!["a@b.com".into()]), "  ").unwrap_err();
        assert!(matches!(err, DeliveryError::Configuration(_)));
    }

    #[test]
    fn test_preflight_no_recipients_is_rejected() {
        let err = preflight(&message(vec![]), "noreply@infinitedb.com").unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected(_)));
    }

    #[test]
    fn test_preflight_ok() {
        assert!(preflight(&message(vec!["a@b.com".into()]), "noreply@infinitedb.com").is_ok());
    }
}
