//! Values passed between the renderer, the delivery gateway and the dispatcher.

use serde::Serialize;
use strum::{AsRefStr, Display};

/// A fully rendered email, ready for a delivery gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    subject: String,
    plain_text: String,
    html: String,
    recipients: Vec<String>,
}

impl RenderedMessage {
    pub fn new(
        subject: impl Into<String>,
        plain_text: impl Into<String>,
        html: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            plain_text: plain_text.into(),
            html: html.into(),
            recipients,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }
}

/// What a gateway reports after accepting a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryReceipt {
    /// The provider confirmed the send operation completed.
    pub completed: bool,
    /// Provider-assigned message id, when it returns one.
    pub message_id: Option<String>,
}

impl DeliveryReceipt {
    pub fn completed(message_id: Option<String>) -> Self {
        Self {
            completed: true,
            message_id,
        }
    }

    pub fn incomplete() -> Self {
        Self::default()
    }
}

/// Terminal state of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DispatchOutcome {
    /// The gateway confirmed completion.
    Delivered,
    /// A known event kind with missing or invalid fields.
    SkippedInvalid,
    /// An event kind this service does not handle.
    SkippedUnknownKind,
    /// The provider refused the message permanently.
    Rejected,
    /// Delivery did not complete; the message must be delivered again.
    TransientFailure,
}

/// Queue-level consequence of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDecision {
    Ack,
    Retry,
}

impl DispatchOutcome {
    pub fn ack_decision(&self) -> AckDecision {
        match self {
            DispatchOutcome::TransientFailure => AckDecision::Retry,
            DispatchOutcome::Delivered
            | DispatchOutcome::SkippedInvalid
            | DispatchOutcome::SkippedUnknownKind
            | DispatchOutcome::Rejected => AckDecision::Ack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_failure_retries() {
        assert_eq!(DispatchOutcome::TransientFailure.ack_decision(), AckDecision::Retry);
        for outcome in [
            DispatchOutcome::Delivered,
            DispatchOutcome::SkippedInvalid,
            DispatchOutcome::SkippedUnknownKind,
            DispatchOutcome::Rejected,
        ] {
            assert_eq!(outcome.ack_decision(), AckDecision::Ack, "{}", outcome);
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(DispatchOutcome::SkippedUnknownKind.as_ref(), "skipped_unknown_kind");
        assert_eq!(DispatchOutcome::Delivered.to_string(), "delivered");
    }

    #[test]
    fn test_receipt_constructors() {
        assert!(DeliveryReceipt::completed(Some("id-1".into())).completed);
        assert_eq!(DeliveryReceipt::incomplete(), DeliveryReceipt { completed: false, message_id: None });
    }
}
