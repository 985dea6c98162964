//! Application-wide error types and their HTTP mapping.

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Proof storage error: {0}")]
    Storage(#[from] opendal::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) | ApiError::Token(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) | ApiError::Storage(_) | ApiError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_)
            | ApiError::Database(_)
            | ApiError::Migrate(_)
            | ApiError::Json(_)
            | ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller.
    fn public_message(&self) -> String {
        match self {
            ApiError::Upstream(msg) => msg.clone(),
            ApiError::Storage(_) => "Proof storage unavailable".to_string(),
            ApiError::Http(_) => "Payment gateway unavailable".to_string(),
            ApiError::Token(_) => "Invalid or expired token".to_string(),
            e if e.status().is_server_error() => "Server error".to_string(),
            e => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::BAD_GATEWAY {
            warn!("Upstream failure: {self}");
        } else if status.is_server_error() {
            error!("{self}");
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<fundraiser_core::Error> for ApiError {
    fn from(e: fundraiser_core::Error) -> Self {
        use fundraiser_core::Error as Domain;
        match e {
            Domain::Validation(msg) => ApiError::Validation(msg),
            Domain::Unauthorized(msg) => ApiError::Authorization(msg),
            e @ Domain::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}
