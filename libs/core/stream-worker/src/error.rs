//! Stream error types and error categorization
//!
//! The category of a processing error decides what happens to the message:
//! - **Transient**: leave it pending so it is redelivered after the claim idle time
//! - **Permanent**: copy it to the dead-letter stream and acknowledge it
//! - **Fatal**: stop the worker without acknowledging; the process must be fixed

use strum::{AsRefStr, Display};
use thiserror::Error;

/// Category of error for determining redelivery behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Temporary failure, the message stays pending and is redelivered
    Transient,
    /// Unrecoverable for this message, dead-letter it
    Permanent,
    /// Unrecoverable for the whole worker (misconfiguration)
    Fatal,
}

impl ErrorCategory {
    /// Whether the message should be redelivered
    pub fn should_redeliver(&self) -> bool {
        matches!(self, ErrorCategory::Transient)
    }

    /// Whether the worker must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCategory::Fatal)
    }
}

/// Stream processing errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Message processing failed
    #[error("Processing error: {message}")]
    Processing {
        message: String,
        category: ErrorCategory,
    },

    /// Processing did not finish within the job timeout
    #[error("Processing timed out after {0}ms")]
    Timeout(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shutdown requested
    #[error("Shutdown requested")]
    Shutdown,
}

impl StreamError {
    /// Create a transient processing error
    pub fn transient(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// Create a permanent processing error
    pub fn permanent(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    /// Create a fatal processing error
    pub fn fatal(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Fatal,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Redis(_) => ErrorCategory::Transient,
            StreamError::Processing { category, .. } => *category,
            StreamError::Timeout(_) => ErrorCategory::Transient,
            StreamError::Config(_) => ErrorCategory::Fatal,
            StreamError::Shutdown => ErrorCategory::Transient,
        }
    }

    /// Redis reported that the consumer group does not exist
    pub fn is_nogroup_error(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.to_string().contains("NOGROUP"))
    }

    /// The client gave up waiting for a reply, e.g. during an idle blocking read
    pub fn is_response_timeout(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_carry_category() {
        assert_eq!(StreamError::transient("x").category(), ErrorCategory::Transient);
        assert_eq!(StreamError::permanent("x").category(), ErrorCategory::Permanent);
        assert_eq!(StreamError::fatal("x").category(), ErrorCategory::Fatal);
    }

    #[test]
    fn test_timeouts_are_redelivered() {
        let err = StreamError::Timeout(30_000);
        assert!(err.category().should_redeliver());
        assert_eq!(err.to_string(), "Processing timed out after 30000ms");
    }

    #[test]
    fn test_config_errors_are_fatal() {
        let err = StreamError::Config("missing sender".into());
        assert!(err.category().is_fatal());
        assert!(!err.category().should_redeliver());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(ErrorCategory::Transient.as_ref(), "transient");
        assert_eq!(ErrorCategory::Fatal.to_string(), "fatal");
    }
}
