use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Request-level failures. Per-key outcomes never end up here.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Request signature rejected: {0}")]
    AuthenticationFailure(String),

    #[error("Malformed interaction payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Interaction handling exceeded {0} seconds")]
    Timeout(u64),
}

impl IntoResponse for BotError {
    fn into_response(self) -> Response {
        tracing::warn!("{}", self);
        // No detail leaves the process.
        match self {
            Self::AuthenticationFailure(_) | Self::MalformedPayload(_) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Invalid request" })),
            )
                .into_response(),
            Self::Timeout(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal error" })),
            )
                .into_response(),
        }
    }
}
