use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Database timeout: {0}")]
    DatabaseTimeout(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The request clashes with stored state; `details` describes a blocking booking.
    #[error("Conflict: {message}")]
    Conflict { message: String, details: Option<Value> },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Database(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            AppError::DatabaseTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg, None),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Conflict { message, details } => (StatusCode::CONFLICT, message, details),
        };

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, message);
        } else {
            tracing::debug!("Rejected request: {}: {}", status, message);
        }

        let body = match details {
            Some(details) => json!({ "error": message, "conflict": details }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
