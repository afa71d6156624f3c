use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use detector::{AnalysisFailed, ReportStoreError};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::source::SourceError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Document source unavailable: {0}")]
    SourceUnavailable(String),

    /// No verdict was produced. Never reported as "not plagiarized".
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisFailed),

    #[error("Report store unavailable: {0}")]
    Reports(#[from] ReportStoreError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServerError {
    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::FileNotFound(_) | ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::SourceUnavailable(_) | ServerError::Analysis(_) => {
                StatusCode::BAD_GATEWAY
            }
            ServerError::Reports(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    fn error_code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::FileNotFound(_) => "FILE_NOT_FOUND",
            ServerError::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            ServerError::Analysis(_) => "ANALYSIS_FAILED",
            ServerError::Reports(_) => "REPORTS_UNAVAILABLE",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ServerError::Analysis(failed) => Some(json!({
                "stage": failed.reason(),
                "report_recorded": failed.recorded,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

impl From<SourceError> for ServerError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(name) => ServerError::FileNotFound(name),
            SourceError::InvalidName(name) => {
                ServerError::BadRequest(format!("invalid file name: {name:?}"))
            }
            other => ServerError::SourceUnavailable(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("background task failed: {err}"))
    }
}
