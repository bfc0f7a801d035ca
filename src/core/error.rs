//! Error types for pool operations and task outcomes.

use thiserror::Error;

/// Errors surfaced by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been released; no further submissions are accepted.
    #[error("pool is closed")]
    Closed,
    /// Construction-time violation of configuration constraints.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure reason delivered to the error sink after a task's final attempt.
///
/// Timeouts are distinguishable by variant, not by message text; the display
/// text "task timed out" is nevertheless stable and safe to match against.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The attempt exceeded the configured deadline and was abandoned.
    /// The underlying computation keeps running; its result is discarded.
    #[error("task timed out")]
    Timeout,
    /// A failure reported by the task itself.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl TaskError {
    /// Whether this error is the timeout sentinel.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
