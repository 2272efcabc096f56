//! API Error Responses

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use data_validator::ValidationError;
use storage::StorageError;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{}", .0.body_text())]
    MalformedBody(#[from] JsonRejection),

    #[error("{}", .0.body_text())]
    MalformedQuery(#[from] QueryRejection),
}

/// Construct a JSON error response with the given status code and message.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(e) => json_error(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()),
            ApiError::MalformedBody(rejection) => {
                json_error(rejection.status(), &rejection.body_text())
            }
            ApiError::MalformedQuery(rejection) => {
                json_error(rejection.status(), &rejection.body_text())
            }
            ApiError::Storage(StorageError::Conflict(message)) => {
                json_error(StatusCode::CONFLICT, &message)
            }
            ApiError::Storage(StorageError::NotFound(message)) => {
                json_error(StatusCode::NOT_FOUND, &format!("{} not found", message))
            }
            ApiError::Storage(e) => {
                error!("Storage failure: {}", e);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal storage error")
            }
        }
    }
}
