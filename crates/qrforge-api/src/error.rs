use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Unified API error. Every failure surfaces as an HTTP status plus a
/// `{"message": "..."}` JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Email already registered. HTTP 400.
    #[error("User already exists with this email")]
    DuplicateEmail,

    /// Unknown email or wrong password — the message is deliberately the
    /// same for both so callers cannot enumerate accounts. HTTP 400.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, expired, or forged bearer token. HTTP 401.
    #[error("Invalid or expired token")]
    Unauthorized,

    /// Missing resource, or a resource owned by someone else — the two are
    /// indistinguishable to the caller. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Email transport failure. HTTP 500.
    #[error("Failed to send email: {0}")]
    Delivery(String),

    /// Store or artifact I/O failure. HTTP 500.
    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::DuplicateEmail | ApiError::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Delivery(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(e) => error!("internal error: {:#}", e),
            ApiError::Delivery(msg) => error!("email delivery failed: {}", msg),
            _ => {}
        }

        let status = self.status();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
