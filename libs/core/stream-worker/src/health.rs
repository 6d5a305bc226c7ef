//! Health check handlers for stream workers.
//!
//! - Liveness probe (`/health`)
//! - Readiness probe (`/ready`): Redis PING, processor health, stream depth
//! - Prometheus metrics (`/metrics`)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::consumer::StreamConsumer;
use crate::metrics;
use crate::registry::StreamProcessor;

/// Shared state for health endpoints.
#[derive(Clone)]
pub struct HealthState {
    redis: ConnectionManager,
    app_name: String,
    app_version: String,
    consumers: Vec<StreamConsumer>,
    processor: Option<Arc<dyn StreamProcessor>>,
}

impl HealthState {
    /// Create a new health state.
    pub fn new(
        redis: ConnectionManager,
        app_name: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            redis,
            app_name: app_name.into(),
            app_version: app_version.into(),
            consumers: Vec::new(),
            processor: None,
        }
    }

    /// Report depth and pending count of a stream on `/ready`.
    pub fn with_consumer(mut self, consumer: StreamConsumer) -> Self {
        self.consumers.push(consumer);
        self
    }

    /// Include the processor's own health check in `/ready`.
    pub fn with_processor(mut self, processor: Arc<dyn StreamProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }
}

/// Health response for liveness probes.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub version: String,
}

/// Liveness probe handler. Always OK while the process serves requests.
pub async fn health_handler(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: state.app_name,
        version: state.app_version,
    })
}

/// Readiness probe handler.
pub async fn ready_handler(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    let mut conn = state.redis.clone();
    let ping: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
    let redis_check = match ping {
        Ok(pong) if pong == "PONG" => Ok(()),
        Ok(other) => Err(format!("unexpected response: {}", other)),
        Err(e) => Err(e.to_string()),
    };

    let processor_check = match &state.processor {
        Some(processor) => match processor.health_check().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(format!("{} reported unhealthy", processor.name())),
            Err(e) => Err(e.to_string()),
        },
        None => Ok(()),
    };

    let mut streams = Vec::with_capacity(state.consumers.len());
    for consumer in &state.consumers {
        match consumer.stream_info().await {
            Ok(info) => streams.push(json!(info)),
            Err(e) => streams.push(json!({ "stream": consumer.stream_name(), "error": e.to_string() })),
        }
    }

    let ready = redis_check.is_ok() && processor_check.is_ok();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "redis": redis_check.err().unwrap_or_else(|| "ok".to_string()),
                "processor": processor_check.err().unwrap_or_else(|| "ok".to_string()),
            },
            "streams": streams,
        })),
    )
}

/// Prometheus metrics handler.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

/// Build the health router.
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
