//! Worker configuration
//!
//! This module provides `WorkerConfig` for configuring the stream worker.

use crate::registry::{MessageKey, StreamDef};
use uuid::Uuid;

/// Configuration for the stream worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Redis stream name
    pub stream_name: String,

    /// Consumer group name
    pub consumer_group: String,

    /// Unique consumer ID (auto-generated if not provided)
    pub consumer_id: String,

    /// Dead letter stream name
    pub dlq_stream: String,

    /// Approximate maximum length of the dead letter stream
    pub max_length: i64,

    /// Entry field holding the payload
    pub payload_field: String,

    /// Batch size for reading messages
    pub batch_size: usize,

    /// Blocking read timeout in milliseconds
    pub block_timeout_ms: u64,

    /// Maximum concurrent messages in flight
    pub max_concurrent_jobs: usize,

    /// Idle time before an unacknowledged message is reclaimed
    pub claim_idle_ms: u64,

    /// Deliveries allowed before a message is dead-lettered
    pub max_deliveries: u32,

    /// Per-message processing deadline
    pub job_timeout_ms: u64,
}

impl WorkerConfig {
    /// Create a new WorkerConfig from a StreamDef
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            stream_name: S::STREAM_NAME.to_string(),
            consumer_group: S::CONSUMER_GROUP.to_string(),
            dlq_stream: S::DLQ_STREAM.to_string(),
            max_length: S::MAX_LENGTH,
            batch_size: S::BATCH_SIZE,
            claim_idle_ms: S::CLAIM_IDLE_MS,
            max_deliveries: S::MAX_DELIVERIES,
            ..Self::new(S::STREAM_NAME, S::CONSUMER_GROUP)
        }
    }

    /// Create a new WorkerConfig with explicit values
    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        let stream_name = stream_name.into();
        Self {
            dlq_stream: format!("{}:dlq", stream_name),
            stream_name,
            consumer_group: consumer_group.into(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            max_length: 100_000,
            payload_field: MessageKey::Payload.to_string(),
            batch_size: 10,
            block_timeout_ms: 1_000,
            max_concurrent_jobs: 1,
            claim_idle_ms: 30_000,
            max_deliveries: 5,
            job_timeout_ms: 30_000,
        }
    }

    /// Override the stream name; the dead letter stream follows it
    pub fn with_stream_name(mut self, stream: impl Into<String>) -> Self {
        self.stream_name = stream.into();
        self.dlq_stream = format!("{}:dlq", self.stream_name);
        self
    }

    /// Set the consumer group
    pub fn with_consumer_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = group.into();
        self
    }

    /// Set the consumer ID
    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    /// Set the DLQ stream name
    pub fn with_dlq_stream(mut self, stream: impl Into<String>) -> Self {
        self.dlq_stream = stream.into();
        self
    }

    /// Set the payload field name
    pub fn with_payload_field(mut self, field: impl Into<String>) -> Self {
        self.payload_field = field.into();
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the blocking read timeout
    pub fn with_blocking(mut self, timeout_ms: u64) -> Self {
        self.block_timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum concurrent jobs
    pub fn with_max_concurrent_jobs(mut self, count: usize) -> Self {
        self.max_concurrent_jobs = count.max(1);
        self
    }

    /// Set the idle time for reclaiming unacknowledged messages
    pub fn with_claim_idle_ms(mut self, idle_ms: u64) -> Self {
        self.claim_idle_ms = idle_ms;
        self
    }

    /// Set the delivery limit
    pub fn with_max_deliveries(mut self, max: u32) -> Self {
        self.max_deliveries = max.max(1);
        self
    }

    /// Set the per-message timeout
    pub fn with_job_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.job_timeout_ms = timeout_ms;
        self
    }
}
