use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::ServiceError;

/// Errors leave the service as a status code plus a free-text message;
/// the detail is only logged.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),

    ValidationError(String),

    /// Failure behind a JSON route.
    ServiceFailure { message: String, detail: String },

    /// Failure behind a full-page route; answered as plain text.
    PageFailure { message: String, detail: String },

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::ServiceFailure { message, detail } | Self::PageFailure { message, detail } => {
                write!(f, "{message}: {detail}")
            }
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::ServiceFailure { message, detail } => {
                tracing::error!("{}: {}", message, detail);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            Self::PageFailure { message, detail } => {
                tracing::error!("{}: {}", message, detail);
                return (StatusCode::INTERNAL_SERVER_ERROR, message).into_response();
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

impl ApiError {
    pub fn not_logged_in() -> Self {
        Self::Unauthorized("Not logged in".to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// JSON 500 carrying `message`.
    pub fn service(message: &str, err: &ServiceError) -> Self {
        Self::ServiceFailure {
            message: message.to_string(),
            detail: err.to_string(),
        }
    }

    /// Plain-text 500 carrying `message`.
    pub fn page(message: &str, err: &ServiceError) -> Self {
        Self::PageFailure {
            message: message.to_string(),
            detail: err.to_string(),
        }
    }
}
