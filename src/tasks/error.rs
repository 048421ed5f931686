//! Task failure taxonomy.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::tasks::graph::TaskId;

/// Error type returned by task bodies, handlers and loaders.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A body error shared between every reader of one task result.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Why a task produced no value.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task body returned an error.
    #[error("{task} failed: {error}")]
    Failed { task: TaskId, error: SharedError },

    /// A prerequisite failed, so the body was never run.
    #[error("{task} skipped: prerequisite {prerequisite} failed")]
    Prerequisite {
        task: TaskId,
        prerequisite: TaskId,
        cause: Arc<TaskError>,
    },

    /// The request context was cancelled.
    #[error("{task} cancelled")]
    Cancelled { task: TaskId },

    /// The request context deadline passed.
    #[error("{task} deadline exceeded")]
    DeadlineExceeded { task: TaskId },

    /// The task body panicked.
    #[error("{task} panicked")]
    Panicked { task: TaskId },

    /// The task belongs to a different graph than the context.
    #[error("{task} is not registered in this graph")]
    ForeignTask { task: TaskId },

    /// A stored value did not have the handle's output type.
    #[error("{task} produced a value that is not a {expected}")]
    TypeMismatch { task: TaskId, expected: &'static str },
}

impl TaskError {
    /// The task this error was recorded for.
    pub fn task(&self) -> TaskId {
        match self {
            TaskError::Failed { task, .. }
            | TaskError::Prerequisite { task, .. }
            | TaskError::Cancelled { task }
            | TaskError::DeadlineExceeded { task }
            | TaskError::Panicked { task }
            | TaskError::ForeignTask { task }
            | TaskError::TypeMismatch { task, .. } => *task,
        }
    }

    /// True for cancellation and deadline expiry, which callers may retry.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            TaskError::Cancelled { .. } | TaskError::DeadlineExceeded { .. }
        )
    }

    /// Follow prerequisite failures down to the error that started them.
    pub fn root_cause(&self) -> &TaskError {
        let mut err = self;
        while let TaskError::Prerequisite { cause, .. } = err {
            err = cause.as_ref();
        }
        err
    }
}

/// Why a request context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Cancelled,
    DeadlineExceeded,
}

impl Interruption {
    pub(crate) fn into_error(self, task: TaskId) -> TaskError {
        match self {
            Interruption::Cancelled => TaskError::Cancelled { task },
            Interruption::DeadlineExceeded => TaskError::DeadlineExceeded { task },
        }
    }
}
