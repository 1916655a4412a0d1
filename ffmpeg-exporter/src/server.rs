use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus_client::{encoding::text::encode, registry::Registry};
use tower_http::trace::TraceLayer;

/// Content type of the OpenMetrics text exposition format
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Error type for metrics endpoint failures
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
    }
}

/// Build the HTTP routes exposing the metrics of `registry`
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/", get(metrics_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Handler for the /metrics endpoint
///
/// Collectors read the progress files, so the encoding runs on the blocking pool.
pub async fn metrics_handler(
    State(registry): State<Arc<Registry>>,
) -> Result<impl IntoResponse, MetricsError> {
    let body = tokio::task::spawn_blocking(move || {
        let mut body = String::new();
        encode(&mut body, &registry).map(|()| body)
    })
    .await
    .map_err(|err| {
        log::error!("Metrics encoding task failed: {err}");
        MetricsError::EncodingFailed
    })?
    .map_err(|err| {
        log::error!("Failed to encode metrics: {err}");
        MetricsError::EncodingFailed
    })?;

    Ok(([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body))
}
