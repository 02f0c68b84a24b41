#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Variants match the error taxonomy in spec §7: each carries the HTTP status
/// and JSON error code the boundary is required to surface.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schema disabled: {0}")]
    SchemaDisabled(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External failure: {0}")]
    ExternalFailure { message: String, upstream_status: Option<u16> },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn external(message: impl Into<String>) -> Self {
        AppError::ExternalFailure {
            message: message.into(),
            upstream_status: None,
        }
    }

    pub fn external_with_status(message: impl Into<String>, status: u16) -> Self {
        AppError::ExternalFailure {
            message: message.into(),
            upstream_status: Some(status),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, detail) = match &self {
            AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone(), None)
            }
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
                Some(msg.clone()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            AppError::SchemaDisabled(msg) => (
                StatusCode::BAD_REQUEST,
                "SCHEMA_DISABLED",
                msg.clone(),
                None,
            ),
            AppError::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, "CONFLICT", msg.clone(), None)
            }
            AppError::ExternalFailure {
                message,
                upstream_status,
            } => {
                tracing::warn!("External failure: {message} (upstream_status={upstream_status:?})");
                (
                    StatusCode::BAD_GATEWAY,
                    "EXTERNAL_FAILURE",
                    "An upstream service failed".to_string(),
                    Some(message.clone()),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(json!({
            "ok": false,
            "error": {
                "code": code,
                "message": message,
                "detail": detail,
            }
        }));

        (status, body).into_response()
    }
}
