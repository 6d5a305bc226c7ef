//! Prometheus metrics for stream workers

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

use crate::error::ErrorCategory;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder.
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() -> Result<(), BuildError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;
        info!("Prometheus metrics initialized");
        Ok::<_, BuildError>(handle)
    })?;
    Ok(())
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Per-worker metrics helper
#[derive(Clone)]
pub struct StreamMetrics {
    stream_name: String,
    processor_name: String,
}

impl StreamMetrics {
    pub fn new(stream_name: impl Into<String>, processor_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            processor_name: processor_name.into(),
        }
    }

    pub fn message_received(&self) {
        counter!(
            "stream_worker_messages_received_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    pub fn message_acked(&self, duration: Duration) {
        counter!(
            "stream_worker_messages_acked_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);

        histogram!(
            "stream_worker_message_duration_seconds",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    pub fn message_failed(&self, category: ErrorCategory) {
        counter!(
            "stream_worker_message_errors_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone(),
            "category" => category.to_string()
        )
        .increment(1);
    }

    pub fn message_dead_lettered(&self) {
        counter!(
            "stream_worker_messages_dlq_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    pub fn messages_claimed(&self, count: usize) {
        counter!(
            "stream_worker_messages_claimed_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_does_not_panic() {
        let metrics = StreamMetrics::new("test-events", "test_processor");
        metrics.message_received();
        metrics.message_failed(ErrorCategory::Transient);
        metrics.messages_claimed(2);
    }

    #[test]
    fn test_init_metrics_twice() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }
}
