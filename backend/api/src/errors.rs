//! Application-wide error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use project_lifecycle::LifecycleError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A blocking lifecycle task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The `x-user-id` header was missing or blank.
    #[error("Missing acting user")]
    Unauthenticated,

    /// A persisted row could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Lifecycle(err) => match err {
                LifecycleError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LifecycleError::Authorization { .. } => StatusCode::FORBIDDEN,
                LifecycleError::InvalidTransition { .. } | LifecycleError::Conflict { .. } => {
                    StatusCode::CONFLICT
                }
                LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
                LifecycleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Database(_)
            | ApiError::Migrate(_)
            | ApiError::Json(_)
            | ApiError::Config(_)
            | ApiError::Corrupt(_)
            | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Lifecycle(err) => err.code(),
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Database(_) => "DATABASE",
            ApiError::Migrate(_) => "MIGRATION",
            ApiError::Json(_) => "JSON",
            ApiError::Config(_) => "CONFIG",
            ApiError::Corrupt(_) => "CORRUPT_RECORD",
            ApiError::Task(_) => "TASK",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
