use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::conversation::StoreError;
use crate::services::firmware_store::FirmwareError;
use crate::services::vision::ImageError;

/// Errors surfaced at the HTTP boundary.
///
/// The calculator client only renders plain text, so bodies are never JSON:
/// validation failures carry a short diagnostic, everything else collapses
/// into the bare reason phrase and the detail stays in the server log.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    #[error("Firmware store error: {0}")]
    Firmware(#[from] FirmwareError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, msg)
            }
            ApiError::LlmError(msg) => {
                tracing::error!("LLM error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, reason(StatusCode::INTERNAL_SERVER_ERROR))
            }
            ApiError::Store(e) => {
                tracing::error!("Session store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, reason(StatusCode::INTERNAL_SERVER_ERROR))
            }
            ApiError::Firmware(e) => {
                tracing::error!("Firmware store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, reason(StatusCode::INTERNAL_SERVER_ERROR))
            }
            ApiError::Image(e) => {
                tracing::error!("Image error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, reason(StatusCode::INTERNAL_SERVER_ERROR))
            }
        };

        (status, body).into_response()
    }
}

fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Error").to_string()
}
