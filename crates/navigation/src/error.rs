//! Error types for navigation.

use thiserror::Error;

/// Errors surfaced by [`crate::Navigator`].
///
/// Every failing operation leaves the navigator exactly as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    /// The destination store could not be resolved.
    #[error("destination '{store_id}' not found")]
    DestinationNotFound { store_id: String },

    /// The position source was queried before it was ready.
    #[error("position source not ready")]
    PositionSourceNotReady,

    /// The source is ready but has no fix yet.
    #[error("current position unknown")]
    PositionUnknown,

    /// The operation needs an active session.
    #[error("no navigation session is active")]
    NotNavigating,

    /// Thresholds or intervals are inconsistent.
    #[error("invalid navigation config: {message}")]
    InvalidConfig { message: String },
}

pub type Result<T> = std::result::Result<T, NavigationError>;
