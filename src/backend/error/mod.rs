//! HTTP Error Conversion
//!
//! Maps the `ChatError` taxonomy onto HTTP responses. The body is always a
//! short JSON object `{"error": "..."}`; database and serialization detail
//! stays in the server log.
//!
//! # Status Code Mapping
//!
//! - `Validation` → 400 Bad Request
//! - `NotFound` → 404 Not Found
//! - `Authorization` → 403 Forbidden
//! - `Conflict` → 409 Conflict
//! - `Transport` → 401 Unauthorized
//! - `Database` / `Serialization` → 500 Internal Server Error

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::shared::error::ChatError;

/// HTTP status for a chat error
pub fn status_code(error: &ChatError) -> StatusCode {
    match error {
        ChatError::Validation { .. } => StatusCode::BAD_REQUEST,
        ChatError::NotFound { .. } => StatusCode::NOT_FOUND,
        ChatError::Authorization { .. } => StatusCode::FORBIDDEN,
        ChatError::Conflict { .. } => StatusCode::CONFLICT,
        ChatError::Transport { .. } => StatusCode::UNAUTHORIZED,
        ChatError::Database(_) | ChatError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = status_code(&self);

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {:?}", self);
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
