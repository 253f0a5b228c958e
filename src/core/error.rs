//! Error types for executor operations.

use thiserror::Error;

use super::outcome::{TaskFailure, TaskTimeout};

/// Errors that fail a whole `run_parallel` call before any task is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// Configuration, run options or task shape are invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The worker pool itself could not be started.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A terminal per-task error, obtained when converting an outcome into a `Result`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// The operation kept failing until retries were exhausted.
    #[error(transparent)]
    Failure(#[from] TaskFailure),
    /// The task exceeded its wall-clock budget.
    #[error(transparent)]
    Timeout(#[from] TaskTimeout),
}

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing file failed.
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    /// A value could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Application-facing result using anyhow for operation bodies.
pub type AppResult<T> = Result<T, anyhow::Error>;
