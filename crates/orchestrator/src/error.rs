//! Error types for the FlowSync orchestrator.
//!
//! This module provides custom error types that implement `IntoResponse`
//! for seamless integration with Axum handlers.
//!
//! Gateway (to-do system) failures are deliberately NOT part of this
//! taxonomy: they are collected as orchestration warnings, never thrown.
//! See [`crate::gateway::GatewayError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level errors for the orchestrator.
#[derive(Error, Debug)]
pub enum AppError {
    /// Task, form, or process definition missing
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Acting user may not complete the task
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// Malformed or unresolvable form submission
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Process engine rejected the mutation
    #[error("Engine error: {0}")]
    Engine(String),

    /// Process graph or node could not be resolved
    #[error("Graph error: {0}")]
    Graph(String),

    /// Flow condition template error
    #[error("Template error: {0}")]
    Template(String),

    /// Parse error (process model JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::NotPermitted(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Engine(msg) => {
                tracing::error!(error = %msg, "Engine error");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Graph(msg) => {
                tracing::error!(error = %msg, "Graph error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Template(msg) => {
                tracing::error!(error = %msg, "Template error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Parse(msg) => {
                tracing::error!(error = %msg, "Parse error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "Serialization error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = AppError::NotFound("Task not found: t-42".to_string());
        assert_eq!(err.to_string(), "Resource not found: Task not found: t-42");
    }

    #[test]
    fn test_not_permitted_error() {
        let err = AppError::NotPermitted("user bob is not the assignee".to_string());
        assert_eq!(err.to_string(), "Not permitted: user bob is not the assignee");
    }

    #[test]
    fn test_engine_error() {
        let err = AppError::Engine("task already completed".to_string());
        assert_eq!(err.to_string(), "Engine error: task already completed");
    }
}
