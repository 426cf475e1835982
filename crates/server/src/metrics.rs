//! Prometheus metrics
//!
//! Pipeline crates record through the `metrics` facade:
//! - `aicc_classifications_total{tier}`
//! - `aicc_clarification_questions_total`
//! - `aicc_unknown_category_fallback_total`
//! - `aicc_sessions_total{outcome}`
//! - `aicc_llm_request_duration_seconds{operation}`, `aicc_llm_errors_total`
//! - `aicc_http_requests_total{endpoint,status}` (this crate)

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global Prometheus recorder.
///
/// Returns `None` when a recorder is already installed, in which case
/// `/metrics` reports the exporter as unavailable.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics exporter not installed".to_string(),
        ),
    }
}

pub fn record_request(endpoint: &'static str, status: StatusCode) {
    ::metrics::counter!(
        "aicc_http_requests_total",
        "endpoint" => endpoint,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}
