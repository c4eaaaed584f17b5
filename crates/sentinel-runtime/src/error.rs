//! Error types for the runtime crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Tmux error.
    #[error("tmux error: {0}")]
    Tmux(#[from] sentinel_tmux::TmuxError),

    /// A blocking tmux call exceeded its time budget.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// A blocking task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),

    /// Runtime not started.
    #[error("runtime not started")]
    NotStarted,

    /// Runtime already started.
    #[error("runtime already started")]
    AlreadyStarted,

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
