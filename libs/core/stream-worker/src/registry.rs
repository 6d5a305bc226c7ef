//! Stream definitions and the processor contract.
//!
//! This module provides:
//! - `StreamDef` trait for domain-specific stream definitions
//! - `StreamProcessor` trait implemented by message handlers
//! - `MessageKey` enum for the field names used in stream entries

use crate::error::StreamError;
use crate::message::StreamMessage;
use async_trait::async_trait;
use strum::{AsRefStr, Display, EnumString};

/// Field names used in stream entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKey {
    /// The raw message payload (UTF-8 JSON).
    Payload,
    /// Entry id of the message in its source stream (dead-letter entries).
    OriginalId,
    /// Source stream name (dead-letter entries).
    SourceStream,
    /// Failure reason (dead-letter entries).
    Error,
    /// How many times the message was delivered before being dead-lettered.
    DeliveryCount,
    /// RFC 3339 timestamp of the dead-lettering.
    FailedAt,
}

/// Stream definition trait.
///
/// Each domain implements this trait to name its stream and tune the
/// redelivery policy for it.
///
/// # Example
///
/// ```rust,ignore
/// use stream_worker::StreamDef;
///
/// pub struct SignupStream;
///
/// impl StreamDef for SignupStream {
///     const STREAM_NAME: &'static str = "signup-events";
///     const CONSUMER_GROUP: &'static str = "signup_workers";
///     const DLQ_STREAM: &'static str = "signup-events:dlq";
/// }
/// ```
pub trait StreamDef: Send + Sync {
    /// The Redis stream name.
    const STREAM_NAME: &'static str;

    /// The consumer group name for this stream.
    const CONSUMER_GROUP: &'static str;

    /// The dead letter stream name.
    const DLQ_STREAM: &'static str;

    /// Approximate MAXLEN applied to the dead letter stream.
    const MAX_LENGTH: i64 = 100_000;

    /// Messages read per XREADGROUP call.
    const BATCH_SIZE: usize = 10;

    /// Idle time after which an unacknowledged message is redelivered.
    const CLAIM_IDLE_MS: u64 = 30_000;

    /// Deliveries allowed before a message is dead-lettered.
    const MAX_DELIVERIES: u32 = 5;
}

/// Trait for message processors.
///
/// Return `Ok(())` to acknowledge the message. The category of a returned
/// [`StreamError`] decides between redelivery, dead-lettering, and stopping
/// the worker.
#[async_trait]
pub trait StreamProcessor: Send + Sync {
    /// Process a single message.
    async fn process(&self, message: &StreamMessage) -> Result<(), StreamError>;

    /// Get the processor name for logging and metric labels.
    fn name(&self) -> &'static str;

    /// Health check for the processor and its downstream dependencies.
    async fn health_check(&self) -> Result<bool, StreamError> {
        Ok(true)
    }
}
