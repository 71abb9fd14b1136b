//! Error types for step-driven task execution

use thiserror::Error;

/// Error produced while stepping a task or by the processor driving it.
///
/// `E` is the error type of the work wrapped by the task, usually the
/// transport error of the pixel service. It is carried through unchanged.
#[derive(Debug, Clone, Error)]
pub enum TaskError<E> {
    #[error("Task execution failed: {0}")]
    Execution(E),

    #[error("Illegal task state: {reason}")]
    IllegalState { reason: String },

    #[error("Task was cancelled")]
    Cancelled,
}

impl<E> TaskError<E> {
    /// Create an illegal state error
    pub fn illegal_state<S: Into<String>>(reason: S) -> Self {
        TaskError::IllegalState {
            reason: reason.into(),
        }
    }

    /// Check if this error indicates cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    /// Check if this error was caused by misuse of a finished task
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, TaskError::IllegalState { .. })
    }

    /// Returns the wrapped execution error, if any.
    pub fn execution_error(&self) -> Option<&E> {
        match self {
            TaskError::Execution(err) => Some(err),
            _ => None,
        }
    }
}

impl<E: PartialEq> PartialEq for TaskError<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TaskError::Execution(a), TaskError::Execution(b)) => a == b,
            (
                TaskError::IllegalState { reason: a },
                TaskError::IllegalState { reason: b },
            ) => a == b,
            (TaskError::Cancelled, TaskError::Cancelled) => true,
            _ => false,
        }
    }
}

impl<E: Eq> Eq for TaskError<E> {}

/// Errors related to processor configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Asynchronous execution requires a tokio runtime handle")]
    MissingRuntime,

    #[error("Unsupported feature: {feature}")]
    UnsupportedFeature { feature: String },
}

/// Result type alias for a single task step
pub type StepResult<P, E> = Result<Option<P>, TaskError<E>>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create an unsupported feature error
    pub fn unsupported_feature<S: Into<String>>(feature: S) -> Self {
        ConfigError::UnsupportedFeature {
            feature: feature.into(),
        }
    }
}
