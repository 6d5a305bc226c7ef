//! Stream Worker Framework
//!
//! A Redis Streams consumer-group worker that feeds raw message payloads to a
//! processor and turns the processor's result into an acknowledgement,
//! a redelivery, or a dead-letter entry.
//!
//! ## Features
//!
//! - **Consumer groups**: horizontal scaling with Redis consumer groups
//! - **At-least-once**: unacknowledged messages are reclaimed after an idle time
//! - **Dead letter stream**: messages out of deliveries, or permanently failing
//! - **Prometheus metrics**: built-in observability
//! - **Health endpoints**: K8s-ready liveness and readiness probes
//!
//! ## Example
//!
//! ```ignore
//! use stream_worker::{StreamDef, StreamWorker, WorkerConfig};
//!
//! struct SignupStream;
//! impl StreamDef for SignupStream {
//!     const STREAM_NAME: &'static str = "signup-events";
//!     const CONSUMER_GROUP: &'static str = "signup_workers";
//!     const DLQ_STREAM: &'static str = "signup-events:dlq";
//! }
//!
//! let config = WorkerConfig::from_stream_def::<SignupStream>();
//! let worker = StreamWorker::new(redis, Arc::new(processor), config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
pub mod connection;
mod consumer;
mod error;
mod health;
mod message;
pub mod metrics;
mod registry;
mod worker;

pub use config::WorkerConfig;
pub use consumer::{ClaimedMessages, StreamConsumer, StreamInfo};
pub use error::{ErrorCategory, StreamError};
pub use health::{health_router, HealthState};
pub use message::StreamMessage;
pub use metrics::{init_metrics, StreamMetrics};
pub use registry::{MessageKey, StreamDef, StreamProcessor};
pub use worker::{settle, Settlement, StreamWorker};
