//! The generic StreamWorker implementation.
//!
//! The worker reads batches with XREADGROUP, hands each message to a
//! [`StreamProcessor`], and settles it according to the result:
//!
//! | Result                      | Settlement                                 |
//! |-----------------------------|--------------------------------------------|
//! | `Ok(())`                    | XACK                                       |
//! | transient error / timeout   | left pending, reclaimed after idle time    |
//! | transient, deliveries spent | dead-lettered                              |
//! | permanent error             | dead-lettered                              |
//! | fatal error                 | left pending, worker stops with the error  |

use crate::config::WorkerConfig;
use crate::consumer::StreamConsumer;
use crate::error::{ErrorCategory, StreamError};
use crate::message::StreamMessage;
use crate::metrics::StreamMetrics;
use crate::registry::StreamProcessor;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

const MAX_BACKOFF_SECS: u64 = 30;

/// What to do with a message once its processor returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Acknowledge it.
    Ack,
    /// Leave it pending so it is delivered again.
    Redeliver,
    /// Copy it to the dead letter stream with a reason, then acknowledge it.
    DeadLetter(String),
    /// Leave it pending and stop the worker.
    Stop,
}

/// Decide the settlement of a processed message.
pub fn settle(result: &Result<(), StreamError>, delivery_count: u32, max_deliveries: u32) -> Settlement {
    let err = match result {
        Ok(()) => return Settlement::Ack,
        Err(err) => err,
    };

    match err.category() {
        ErrorCategory::Fatal => Settlement::Stop,
        ErrorCategory::Permanent => Settlement::DeadLetter(err.to_string()),
        ErrorCategory::Transient if delivery_count >= max_deliveries => Settlement::DeadLetter(format!(
            "gave up after {} deliveries: {}",
            delivery_count, err
        )),
        ErrorCategory::Transient => Settlement::Redeliver,
    }
}

/// Shared per-message processing state, cloned into spawned tasks
struct MessageHandler<P: StreamProcessor> {
    consumer: StreamConsumer,
    processor: Arc<P>,
    metrics: StreamMetrics,
    job_timeout_ms: u64,
    max_deliveries: u32,
}

impl<P: StreamProcessor> MessageHandler<P> {
    /// Process and settle one message. Only a fatal error is returned.
    async fn handle(&self, message: StreamMessage) -> Result<(), StreamError> {
        self.metrics.message_received();
        debug!(
            message_id = %message.id,
            delivery_count = message.delivery_count,
            redelivery = message.is_redelivery(),
            age_ms = message.age_ms(),
            "Processing message"
        );

        let started = Instant::now();
        let result = match tokio::time::timeout(
            Duration::from_millis(self.job_timeout_ms),
            self.processor.process(&message),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StreamError::Timeout(self.job_timeout_ms)),
        };

        if let Err(e) = &result {
            self.metrics.message_failed(e.category());
        }

        match settle(&result, message.delivery_count, self.max_deliveries) {
            Settlement::Ack => {
                if let Err(e) = self.consumer.ack(&message.id).await {
                    warn!(message_id = %message.id, error = %e, "Failed to acknowledge message");
                    return Ok(());
                }
                self.metrics.message_acked(started.elapsed());
            }
            Settlement::Redeliver => {
                warn!(
                    message_id = %message.id,
                    delivery_count = message.delivery_count,
                    max_deliveries = self.max_deliveries,
                    error = ?result.as_ref().err(),
                    "Message left pending for redelivery"
                );
            }
            Settlement::DeadLetter(reason) => {
                match self.consumer.dead_letter(&message, &reason).await {
                    Ok(()) => self.metrics.message_dead_lettered(),
                    Err(e) => {
                        error!(message_id = %message.id, error = %e, "Failed to dead-letter message")
                    }
                }
            }
            Settlement::Stop => {
                if let Err(e) = result {
                    error!(message_id = %message.id, error = %e, "Fatal processing error, stopping worker");
                    return Err(e);
                }
            }
        }

        Ok(())
    }
}

/// Generic stream worker that feeds raw messages to a processor.
pub struct StreamWorker<P: StreamProcessor> {
    consumer: StreamConsumer,
    handler: Arc<MessageHandler<P>>,
    config: WorkerConfig,
    concurrency_semaphore: Arc<Semaphore>,
}

impl<P: StreamProcessor + 'static> StreamWorker<P> {
    /// Create a new stream worker.
    pub fn new(redis: ConnectionManager, processor: Arc<P>, config: WorkerConfig) -> Self {
        let consumer = StreamConsumer::new(redis, config.clone());
        let handler = MessageHandler {
            consumer: consumer.clone(),
            metrics: StreamMetrics::new(&config.stream_name, processor.name()),
            processor,
            job_timeout_ms: config.job_timeout_ms,
            max_deliveries: config.max_deliveries,
        };

        Self {
            consumer,
            handler: Arc::new(handler),
            concurrency_semaphore: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            config,
        }
    }

    /// Get a reference to the consumer for health checks.
    pub fn consumer(&self) -> &StreamConsumer {
        &self.consumer
    }

    /// Run the worker loop until shutdown or a fatal processing error.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            consumer_id = %self.config.consumer_id,
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            processor = %self.handler.processor.name(),
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "Starting stream worker"
        );

        self.consumer.ensure_consumer_group().await?;

        let claim_interval = Duration::from_millis((self.config.claim_idle_ms / 2).max(1_000));
        let mut last_claim: Option<Instant> = None;
        let mut consecutive_errors: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            if last_claim.is_none_or(|at| at.elapsed() >= claim_interval) {
                last_claim = Some(Instant::now());
                match self.consumer.claim_stale().await {
                    Ok(claimed) => {
                        self.handler
                            .metrics
                            .messages_claimed(claimed.redeliver.len() + claimed.exhausted.len());
                        for message in claimed.exhausted {
                            let reason = format!("exceeded {} deliveries", self.config.max_deliveries);
                            if self.consumer.dead_letter(&message, &reason).await.is_ok() {
                                self.handler.metrics.message_dead_lettered();
                            }
                        }
                        self.process_batch(claimed.redeliver).await?;
                    }
                    Err(e) => warn!(error = %e, "Failed to claim stale messages"),
                }
            }

            let read = tokio::select! {
                _ = shutdown.changed() => break,
                read = self.consumer.read_new() => read,
            };

            match read {
                Ok(messages) => {
                    if consecutive_errors > 0 {
                        info!(consecutive_errors, "Redis connection recovered");
                        consecutive_errors = 0;
                    }
                    self.process_batch(messages).await?;
                }
                Err(e) if e.is_response_timeout() => {
                    debug!("Blocking read timed out with no messages");
                }
                Err(e) if e.is_nogroup_error() => {
                    warn!("Consumer group missing, recreating");
                    if let Err(e) = self.consumer.ensure_consumer_group().await {
                        error!(error = %e, "Failed to recreate consumer group");
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    let backoff = Duration::from_secs(2u64.pow(consecutive_errors.min(5)).min(MAX_BACKOFF_SECS));
                    warn!(
                        error = %e,
                        consecutive_errors,
                        backoff_secs = backoff.as_secs(),
                        "Failed to read from stream, backing off"
                    );
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        info!(stream = %self.config.stream_name, "Stream worker stopped");
        Ok(())
    }

    /// Process a batch concurrently, bounded by `max_concurrent_jobs`.
    async fn process_batch(&self, messages: Vec<StreamMessage>) -> Result<(), StreamError> {
        if messages.is_empty() {
            return Ok(());
        }

        let mut tasks = JoinSet::new();
        for message in messages {
            let permit = Arc::clone(&self.concurrency_semaphore)
                .acquire_owned()
                .await
                .map_err(|_| StreamError::Shutdown)?;
            let handler = Arc::clone(&self.handler);
            tasks.spawn(async move {
                let result = handler.handle(message).await;
                drop(permit);
                result
            });
        }

        let mut fatal = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    fatal.get_or_insert(e);
                }
                Err(e) => error!(error = %e, "Message task panicked"),
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_acked() {
        assert_eq!(settle(&Ok(()), 1, 5), Settlement::Ack);
    }

    #[test]
    fn test_transient_is_redelivered_until_limit() {
        let result = Err(StreamError::transient("provider incomplete"));
        assert_eq!(settle(&result, 1, 5), Settlement::Redeliver);
        assert_eq!(settle(&result, 4, 5), Settlement::Redeliver);

        match settle(&result, 5, 5) {
            Settlement::DeadLetter(reason) => {
                assert!(reason.contains("5 deliveries"));
                assert!(reason.contains("provider incomplete"));
            }
            other => panic!("expected dead letter, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_is_redelivered() {
        let result = Err(StreamError::Timeout(1_000));
        assert_eq!(settle(&result, 1, 5), Settlement::Redeliver);
    }

    #[test]
    fn test_permanent_is_dead_lettered_immediately() {
        let result = Err(StreamError::permanent("cannot be sent"));
        assert_eq!(
            settle(&result, 1, 5),
            Settlement::DeadLetter("Processing error: cannot be sent".to_string())
        );
    }

    #[test]
    fn test_fatal_stops_the_worker() {
        let result = Err(StreamError::fatal("sender address not configured"));
        assert_eq!(settle(&result, 1, 5), Settlement::Stop);
        assert_eq!(settle(&result, 9, 5), Settlement::Stop);
    }
}
