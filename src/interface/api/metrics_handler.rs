//! Prometheus metrics handler

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Initialize the Prometheus metrics exporter
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("negotiation_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()?;

    describe_metrics();
    Ok(handle)
}

/// Register metric descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(
        "negotiations_total",
        "Total number of negotiation attempts by outcome"
    );
    describe_histogram!(
        "negotiation_duration_seconds",
        "Time from offer creation to applied answer"
    );
    describe_gauge!("session_active", "1 while a session is active");
}

/// HTTP metrics handler
pub async fn metrics_handler(
    axum::extract::State(prometheus_handle): axum::extract::State<PrometheusHandle>,
) -> Response {
    let metrics = prometheus_handle.render();
    (StatusCode::OK, metrics).into_response()
}
