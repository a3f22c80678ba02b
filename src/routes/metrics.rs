use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Install the Prometheus recorder and describe the worker's metrics.
pub fn install_recorder() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!(
        "anpr_violations_total",
        "Violations processed, labelled by resulting status"
    );
    metrics::describe_histogram!(
        "anpr_processing_seconds",
        "Time to localize, read and match one violation image"
    );
    metrics::describe_gauge!(
        "anpr_backlog_depth",
        "Eligible violations found by the latest poll"
    );
    metrics::describe_counter!(
        "anpr_localization_fallbacks_total",
        "Frames read in full because no plate region was found"
    );

    Ok(handle)
}

/// GET /metrics: Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
