use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Page body not ready after {0:?}")]
    ExtractionTimeout(std::time::Duration),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable error kind carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "AUTHORIZATION_ERROR",
            AppError::ExtractionTimeout(_) => "EXTRACTION_TIMEOUT",
            AppError::Extraction(_) => "EXTRACTION_ERROR",
            AppError::Inference(_) => "INFERENCE_ERROR",
            AppError::MalformedOutput(_) => "MALFORMED_OUTPUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason.to_string()),
            AppError::ExtractionTimeout(timeout) => {
                tracing::warn!("Extraction timed out after {timeout:?}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    format!(
                        "The job posting did not finish loading within {}s",
                        timeout.as_secs()
                    ),
                )
            }
            AppError::Extraction(msg) => {
                tracing::error!("Extraction error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The job posting could not be loaded".to_string(),
                )
            }
            AppError::Inference(msg) => {
                tracing::error!("Inference error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The ranking model failed to respond".to_string(),
                )
            }
            AppError::MalformedOutput(msg) => {
                tracing::error!("Malformed model output: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The ranking model returned an unreadable result".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
