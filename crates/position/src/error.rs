//! Error types for position sources.

use thiserror::Error;

/// Errors that can occur while initializing or polling a position source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// The source was queried before initialization completed.
    #[error("position source not ready - initialize it before sampling")]
    NotReady,

    /// Initialization is already running on another task.
    #[error("position source initialization already in progress")]
    InitializationInProgress,

    /// Required credentials were empty.
    #[error("missing positioning credential '{field}'")]
    MissingCredentials { field: &'static str },

    /// The positioning SDK rejected initialization.
    #[error("position source initialization failed: {reason}")]
    InitializationFailed { reason: String },

    /// The positioning SDK did not answer within the configured bound.
    #[error("position source initialization timed out after {timeout_ms}ms")]
    InitializationTimeout { timeout_ms: u64 },
}

pub type Result<T> = std::result::Result<T, PositionError>;
