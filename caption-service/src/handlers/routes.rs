//! Preflight, not-found and method-not-allowed responses for the public API.

use axum::{
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};

/// Prefix under which every API route lives.
pub const API_PREFIX: &str = "/api/";

pub const GENERATE_PATH: &str = "/api/generate";

/// CORS preflight: 200, empty body.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                "Content-Type, Authorization",
            ),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn is_api_path(path: &str) -> bool {
    path != "/" && path.starts_with(API_PREFIX)
}

/// Everything the router did not match.
///
/// Paths outside `/api/` are rejected before the method is looked at, so
/// `OPTIONS` on a non-API path is still a 404.
pub async fn fallback(method: Method, uri: Uri) -> Response {
    if !is_api_path(uri.path()) {
        return not_found();
    }

    if method == Method::OPTIONS {
        return preflight().await.into_response();
    }

    not_found()
}
