//! Stream consumer for Redis operations
//!
//! Reads, acknowledges, reclaims and dead-letters messages of one stream
//! through a consumer group.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::message::StreamMessage;
use crate::registry::MessageKey;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use redis::RedisResult;
use tracing::{debug, info, warn};

/// Messages recovered from the pending entries list
#[derive(Debug, Default)]
pub struct ClaimedMessages {
    /// Messages to process again
    pub redeliver: Vec<StreamMessage>,
    /// Messages that used up their deliveries
    pub exhausted: Vec<StreamMessage>,
}

/// Stream consumer for Redis operations
#[derive(Clone)]
pub struct StreamConsumer {
    redis: ConnectionManager,
    config: WorkerConfig,
}

impl StreamConsumer {
    /// Create a new StreamConsumer
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self { redis, config }
    }

    /// Get the stream name
    pub fn stream_name(&self) -> &str {
        &self.config.stream_name
    }

    /// Create the consumer group if it doesn't exist
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
                Ok(())
            }
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Read new messages, blocking up to the configured timeout
    pub async fn read_new(&self) -> Result<Vec<StreamMessage>, StreamError> {
        let mut conn = self.redis.clone();

        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg("COUNT")
            .arg(self.config.batch_size)
            .arg("BLOCK")
            .arg(self.config.block_timeout_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let entries = reply
            .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect::<Vec<_>>())
            .unwrap_or_default();

        self.into_messages(entries, |_| 1).await
    }

    /// Reclaim messages that stayed unacknowledged longer than the claim idle time
    ///
    /// XCLAIM increments the delivery counter, so a reclaimed message reports
    /// one more delivery than XPENDING showed.
    pub async fn claim_stale(&self) -> Result<ClaimedMessages, StreamError> {
        let mut conn = self.redis.clone();

        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(self.config.claim_idle_ms)
            .arg("-")
            .arg("+")
            .arg(self.config.batch_size)
            .query_async(&mut conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(ClaimedMessages::default());
        }

        let mut claim = redis::cmd("XCLAIM");
        claim
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg(self.config.claim_idle_ms);
        for entry in &pending.ids {
            claim.arg(&entry.id);
        }

        let claimed: StreamClaimReply = claim.query_async(&mut conn).await?;

        let messages = self
            .into_messages(claimed.ids, |id| {
                pending
                    .ids
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| p.times_delivered as u32 + 1)
                    .unwrap_or(1)
            })
            .await?;

        let (exhausted, redeliver): (Vec<_>, Vec<_>) = messages
            .into_iter()
            .partition(|m| m.delivery_count > self.config.max_deliveries);

        if !redeliver.is_empty() || !exhausted.is_empty() {
            warn!(
                stream = %self.config.stream_name,
                redeliver = redeliver.len(),
                exhausted = exhausted.len(),
                "Claimed stale messages"
            );
        }

        Ok(ClaimedMessages {
            redeliver,
            exhausted,
        })
    }

    /// Acknowledge a message
    pub async fn ack(&self, message_id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: i64 = redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async(&mut conn)
            .await?;

        debug!(message_id = %message_id, "Acknowledged message");
        Ok(())
    }

    /// Copy a message to the dead letter stream and acknowledge it
    pub async fn dead_letter(&self, message: &StreamMessage, reason: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: (String, i64) = redis::pipe()
            .atomic()
            .cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.config.max_length)
            .arg("*")
            .arg(MessageKey::Payload.as_ref())
            .arg(&message.payload)
            .arg(MessageKey::OriginalId.as_ref())
            .arg(&message.id)
            .arg(MessageKey::SourceStream.as_ref())
            .arg(&self.config.stream_name)
            .arg(MessageKey::Error.as_ref())
            .arg(reason)
            .arg(MessageKey::DeliveryCount.as_ref())
            .arg(message.delivery_count)
            .arg(MessageKey::FailedAt.as_ref())
            .arg(Utc::now().to_rfc3339())
            .cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(&message.id)
            .query_async(&mut conn)
            .await?;

        warn!(
            message_id = %message.id,
            dlq = %self.config.dlq_stream,
            delivery_count = message.delivery_count,
            reason = %reason,
            "Moved message to dead letter stream"
        );
        Ok(())
    }

    /// Get stream length and pending count
    pub async fn stream_info(&self) -> Result<StreamInfo, StreamError> {
        let mut conn = self.redis.clone();

        let length: i64 = redis::cmd("XLEN")
            .arg(&self.config.stream_name)
            .query_async(&mut conn)
            .await?;

        let pending: RedisResult<(i64, Option<String>, Option<String>, Option<Vec<(String, i64)>>)> =
            redis::cmd("XPENDING")
                .arg(&self.config.stream_name)
                .arg(&self.config.consumer_group)
                .query_async(&mut conn)
                .await;

        Ok(StreamInfo {
            stream_name: self.config.stream_name.clone(),
            consumer_group: self.config.consumer_group.clone(),
            length,
            pending_count: pending.map(|(count, _, _, _)| count).unwrap_or(0),
        })
    }

    /// Turn raw entries into messages; entries without a payload are dead-lettered
    async fn into_messages(
        &self,
        entries: Vec<StreamId>,
        delivery_count: impl Fn(&str) -> u32,
    ) -> Result<Vec<StreamMessage>, StreamError> {
        let mut messages = Vec::with_capacity(entries.len());

        for entry in entries {
            let count = delivery_count(&entry.id);
            match entry.get::<String>(&self.config.payload_field) {
                Some(payload) => {
                    messages.push(StreamMessage::with_delivery_count(entry.id, payload, count));
                }
                None => {
                    let fields: Vec<&str> = entry.map.keys().map(String::as_str).collect();
                    warn!(
                        message_id = %entry.id,
                        fields = ?fields,
                        field = %self.config.payload_field,
                        "Stream entry has no payload field"
                    );
                    let empty = StreamMessage::with_delivery_count(entry.id.clone(), "", count);
                    self.dead_letter(&empty, "missing payload field").await?;
                }
            }
        }

        Ok(messages)
    }
}

/// Stream information
#[derive(Debug, Clone, serde::Serialize)]
pub struct StreamInfo {
    pub stream_name: String,
    pub consumer_group: String,
    pub length: i64,
    pub pending_count: i64,
}
