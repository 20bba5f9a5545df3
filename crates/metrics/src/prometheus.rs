//! Prometheus exporter wiring and the `/metrics` endpoint (spec §4.9, §6).

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the global `metrics` recorder and returns the handle used to
/// render the `/metrics` scrape body. Must be called exactly once, before
/// any `counter!`/`histogram!`/`gauge!` call runs.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder")
}

/// Axum handler for `GET /metrics` (spec §6). Exposition format is plain
/// Prometheus text — no content negotiation needed, there's only one
/// consumer.
pub async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}
