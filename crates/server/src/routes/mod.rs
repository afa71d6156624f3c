//! API route handlers
//!
//! - `health`: liveness, readiness, metrics and metadata
//! - `analyze`: submission analysis
//! - `reports`: stored reports per work

pub mod analyze;
pub mod health;
pub mod reports;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "plagscan",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /analyze",
            "GET /reports/{work_id}",
            "GET /health",
            "GET /ready",
            "GET /metrics",
            "GET /metadata"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
