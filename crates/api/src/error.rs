//! API error types and response mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fetcharr_core::FetcharrError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {field} - {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Core(#[from] FetcharrError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(resource) => (StatusCode::NOT_FOUND, resource.clone()),
            ApiError::Validation { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Core(error) => match error {
                FetcharrError::MovieNotFound { .. }
                | FetcharrError::EpisodeNotFound { .. }
                | FetcharrError::NotFound { .. } => (StatusCode::NOT_FOUND, error.to_string()),
                FetcharrError::ValidationError { .. }
                | FetcharrError::ConfigurationError { .. } => {
                    (StatusCode::BAD_REQUEST, error.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
            },
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
