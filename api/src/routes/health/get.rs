use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::response::ApiResponse;
use util::config;

#[derive(Serialize, Default)]
pub struct HealthResponse {
    pub service: String,
    pub status: &'static str,
}

/// GET /health
///
/// Liveness probe. Always answers `200 OK` while the process is up.
pub async fn health() -> impl IntoResponse {
    let payload = HealthResponse {
        service: config::project_name(),
        status: "ok",
    };
    (
        StatusCode::OK,
        Json(ApiResponse::success(payload, "Service is healthy")),
    )
}
