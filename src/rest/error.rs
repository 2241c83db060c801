// rest/error.rs — API error taxonomy and response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::tasks::InvalidField;

/// Everything a handler can fail with. The `IntoResponse` impl is the only
/// place status codes and error bodies are produced.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid or missing API key")]
    Unauthorized,
    #[error(transparent)]
    Validation(#[from] InvalidField),
    #[error("task not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "detail": "invalid or missing API key" })),
            )
                .into_response(),
            Self::Validation(invalid) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "detail": { "field": invalid.field, "message": invalid.message }
                })),
            )
                .into_response(),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "Task not found" })),
            )
                .into_response(),
            Self::Storage(err) => {
                // Full error stays server-side; the caller gets a generic message.
                error!("storage failure: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "internal storage error" })),
                )
                    .into_response()
            }
        }
    }
}
