use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::middleware::metrics::render_metrics;

/// Health check endpoint for Docker/K8s liveness checks.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "caption-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint. The service holds no connections, so it is
/// ready as soon as it is listening.
pub async fn readiness_check() -> StatusCode {
    StatusCode::OK
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        render_metrics(),
    )
}
