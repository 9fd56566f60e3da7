//! API error mapping
//!
//! Client errors carry their validation message. Server errors are logged
//! here and answered with a generic message only.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::ValidationError;
use inference_engine::InferenceError;
use serde::{Deserialize, Serialize};
use storage::StorageError;
use thiserror::Error;
use tracing::error;

/// Errors returned by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Malformed request: {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Short outcome tag used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Rejected { .. } => "invalid_request",
            ApiError::Inference(_) => "inference_error",
            ApiError::Storage(_) => "storage_error",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Rejected { status, .. } => *status,
            ApiError::Inference(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                ApiError::Validation(ValidationError::InvalidFormat(e.body_text()))
            }
            JsonRejection::MissingJsonContentType(e) => ApiError::Rejected {
                status: StatusCode::BAD_REQUEST,
                message: e.body_text(),
            },
            other => ApiError::Rejected {
                status: other.status(),
                message: other.body_text(),
            },
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Inference(e) => {
                error!("Inference error: {}", e);
                "inference failed".to_string()
            }
            ApiError::Storage(e) => {
                error!("Storage error, classification discarded: {}", e);
                "failed to record query".to_string()
            }
        };

        let body = ErrorBody {
            error: self.kind().to_string(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ValidationError::Empty).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(InferenceError::InferenceFailed("oom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StorageError::NotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let response =
            ApiError::from(InferenceError::InferenceFailed("tensor shape [1, 7]".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "inference_error");
        assert_eq!(body.message, "inference failed");
    }
}
