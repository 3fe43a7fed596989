use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::capture::CameraError;

/// Handler failures, each carrying the status and reason it renders with.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A backing subsystem is down or failed mid-operation.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Requested media does not exist. Renders with an empty body.
    #[error("not found")]
    NotFound,

    #[error("photo slot error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceUnavailable(reason) => {
                (StatusCode::SERVICE_UNAVAILABLE, reason).into_response()
            }
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Storage(e) => {
                tracing::error!("photo slot error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "photo slot unavailable".to_string(),
                )
                    .into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()).into_response()
            }
        }
    }
}

impl From<CameraError> for ApiError {
    fn from(e: CameraError) -> Self {
        match e {
            CameraError::NotInitialized => {
                ApiError::ServiceUnavailable("camera not initialized".into())
            }
            CameraError::HardwareUnavailable => {
                ApiError::ServiceUnavailable("camera capture failed".into())
            }
            CameraError::Sensor(e) => ApiError::ServiceUnavailable(format!("camera error: {e}")),
        }
    }
}

impl From<hound::Error> for ApiError {
    fn from(e: hound::Error) -> Self {
        ApiError::Internal(format!("audio encoding failed: {e}"))
    }
}
