//! Health check endpoint.

use axum::{Router, response::Response, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::response::ApiResponse;

/// Health check payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

async fn health_check() -> Response {
    ApiResponse::ok(
        "Service is healthy",
        HealthResponse {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

/// Creates health check routes.
pub fn routes<R: Send + Sync + 'static>() -> Router<AppState<R>> {
    Router::new().route("/health", get(health_check))
}
