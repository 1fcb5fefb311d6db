//! Error types for workflow runs

use std::time::Duration;
use thiserror::Error;

/// Why a workflow run produced no usable response
///
/// These are values handed back to the caller, never panics; a backend
/// reporting an error is a `RequestFailed`, not a transport failure.
#[derive(Debug, Error)]
pub enum RunError {
    /// The backend answered with an error payload
    #[error("workflow run request failed ({code}): {message}")]
    RequestFailed { code: i64, message: String },

    /// No answer within the deadline
    #[error("workflow run timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The answer did not describe a valid runner state
    #[error("invalid workflow runner state: {0}")]
    InvalidState(String),

    /// The backend could not be reached
    #[error("workflow backend unreachable: {0}")]
    Transport(String),
}

/// Result type for workflow runs
pub type Result<T> = std::result::Result<T, RunError>;
