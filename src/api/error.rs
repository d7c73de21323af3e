//! Error responses for the HTTP API

use crate::error::CoreError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};

/// Renders as `{ "error": <code>, "message": <text> }` with the mapped status.
///
/// Storage details never reach the caller; they are logged where the error is raised.
impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(serde_json::json!({
                "error": self.code(),
                "message": self.public_message(),
            })),
        )
            .into_response()
    }
}
