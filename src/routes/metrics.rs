//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;

    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "chat_bridge_requests_total",
        "Total number of chat completion requests processed"
    );
    metrics::describe_histogram!(
        "chat_bridge_request_duration_seconds",
        "Time until the upstream answer started (streaming) or finished"
    );
    metrics::describe_counter!(
        "chat_bridge_fragments_total",
        "Text fragments forwarded to clients"
    );
    metrics::describe_counter!(
        "chat_bridge_upstream_errors_total",
        "Failed upstream calls by kind"
    );
}

/// Prometheus metrics endpoint handler
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}

/// Record a request
pub fn record_request(status: &str, model: &str, duration_secs: f64) {
    metrics::counter!("chat_bridge_requests_total", "status" => status.to_string(), "model" => model.to_string())
        .increment(1);
    metrics::histogram!("chat_bridge_request_duration_seconds", "model" => model.to_string())
        .record(duration_secs);
}

/// Record fragments forwarded for one answer
pub fn record_fragments(model: &str, count: u64) {
    metrics::counter!("chat_bridge_fragments_total", "model" => model.to_string())
        .increment(count);
}

/// Record a failed upstream call
pub fn record_upstream_error(kind: &str) {
    metrics::counter!("chat_bridge_upstream_errors_total", "kind" => kind.to_string())
        .increment(1);
}
