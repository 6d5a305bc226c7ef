//! Error types for the notifications domain.

use crate::events::EventKind;
use thiserror::Error;

/// Result type for template compilation and rendering.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors raised while building or running the template engine.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Template compilation or rendering error.
    #[error("Template rendering error: {0}")]
    TemplateError(String),
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::TemplateError(err.to_string())
    }
}

impl From<handlebars::TemplateError> for NotificationError {
    fn from(err: handlebars::TemplateError) -> Self {
        NotificationError::TemplateError(err.to_string())
    }
}

/// Why a raw payload could not be turned into an [`AccountEvent`](crate::AccountEvent).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// The payload is not a JSON object of the expected shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The discriminator is absent or names a kind this service does not handle.
    #[error("Unknown event kind: {}", .0.as_deref().unwrap_or("<missing>"))]
    UnknownKind(Option<String>),

    /// A known kind is missing a required field, or the field is blank.
    #[error("{kind} is missing required field `{field}`")]
    MissingRequiredField { kind: EventKind, field: &'static str },

    /// A required field is present but unusable.
    #[error("{kind} has invalid field `{field}`: {reason}")]
    InvalidField {
        kind: EventKind,
        field: &'static str,
        reason: String,
    },
}

impl ClassificationError {
    /// The event kind, when the discriminator was recognised.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            ClassificationError::MissingRequiredField { kind, .. }
            | ClassificationError::InvalidField { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Failure reported by a delivery gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Temporary failure; sending again may succeed.
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// The provider refused this message for good.
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// The gateway itself is misconfigured (sender address, credentials).
    #[error("Delivery gateway misconfigured: {0}")]
    Configuration(String),
}

/// Failure of a dispatch that the queue binding must act on.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload could not be parsed; surfaced for redelivery.
    #[error(transparent)]
    MalformedPayload(ClassificationError),

    /// The delivery gateway is misconfigured; retrying will not help.
    #[error("Dispatcher configuration error: {0}")]
    Configuration(String),
}
