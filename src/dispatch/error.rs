//! Dispatch failures and their HTTP status mapping.

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::tasks::{Interruption, SharedError, TaskError};

/// Why a request produced no response value.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No registered pattern matches the path.
    #[error("no route matches {path}")]
    NotFound { path: String },

    /// The path matched but no handler exists for the method.
    #[error("method {method} not allowed for {pattern}")]
    MethodNotAllowed {
        method: Method,
        pattern: String,
        allowed: Vec<Method>,
    },

    /// A middleware or route prerequisite task failed.
    #[error("prerequisite failed: {0}")]
    Prerequisite(TaskError),

    /// The primary handler returned an error.
    #[error("handler for {pattern} failed: {error}")]
    Handler { pattern: String, error: SharedError },

    /// The primary handler panicked.
    #[error("handler for {pattern} panicked")]
    HandlerPanicked { pattern: String },

    /// The request was cancelled or ran out of time.
    #[error("request interrupted: {0:?}")]
    Interrupted(Interruption),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::Prerequisite(TaskError::Cancelled { .. })
            | DispatchError::Interrupted(Interruption::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Prerequisite(TaskError::DeadlineExceeded { .. })
            | DispatchError::Interrupted(Interruption::DeadlineExceeded) => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::Prerequisite(_)
            | DispatchError::Handler { .. }
            | DispatchError::HandlerPanicked { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::NotFound { .. } => "not_found",
            DispatchError::MethodNotAllowed { .. } => "method_not_allowed",
            DispatchError::Prerequisite(_) => "prerequisite",
            DispatchError::Handler { .. } => "handler",
            DispatchError::HandlerPanicked { .. } => "panic",
            DispatchError::Interrupted(_) => "interrupted",
        }
    }
}
