//! Stream message wrapper
//!
//! A raw payload together with its stream metadata.

use chrono::{DateTime, Utc};

/// A message read from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Redis stream entry ID (e.g., "1234567890123-0")
    pub id: String,

    /// The raw payload, untouched
    pub payload: String,

    /// Number of times this message has been delivered, including this one
    pub delivery_count: u32,

    /// When the entry was appended (parsed from the entry ID)
    pub timestamp: DateTime<Utc>,
}

impl StreamMessage {
    /// Create a first delivery of a message
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::with_delivery_count(id, payload, 1)
    }

    /// Create a message with a known delivery count
    pub fn with_delivery_count(
        id: impl Into<String>,
        payload: impl Into<String>,
        delivery_count: u32,
    ) -> Self {
        let id = id.into();
        let timestamp = parse_timestamp(&id);
        Self {
            id,
            payload: payload.into(),
            delivery_count,
            timestamp,
        }
    }

    /// Payload bytes as handed to processors
    pub fn as_bytes(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    /// Check if this is a redelivery
    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }

    /// Get age in milliseconds
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.timestamp).num_milliseconds()
    }
}

/// Stream IDs are in format "timestamp_ms-sequence"
fn parse_timestamp(stream_id: &str) -> DateTime<Utc> {
    stream_id
        .split('-')
        .next()
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}
