//! The position source abstraction.
//!
//! Navigation and geofencing both poll a [`PositionSource`]; neither cares
//! whether it is backed by a positioning SDK, a simulator or a fixed script.

use crate::error::Result;
use crate::sample::Position;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Readiness of a position source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SourceState {
    /// Initialization has not been attempted yet.
    NotReady,
    /// Initialization is running.
    Initializing,
    /// Samples may be requested.
    Ready,
    /// The last initialization attempt failed; the caller may retry.
    Failed { reason: String },
}

impl SourceState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SourceState::Ready)
    }
}

/// A provider of timestamped position fixes.
///
/// Implementations are polled concurrently by the navigation and geofence
/// loops, so `sample` takes `&self`.
pub trait PositionSource: Send + Sync {
    /// Current readiness.
    fn state(&self) -> SourceState;

    /// Latest fix.
    ///
    /// Returns `Err(PositionError::NotReady)` before the source is ready and
    /// `Ok(None)` when ready but no fix is currently available. Successive
    /// fixes never go backwards in time.
    fn sample(&self) -> Result<Option<Position>>;
}

/// Type alias for a shared position source.
pub type PositionSourceRef = Arc<dyn PositionSource>;

impl<T: PositionSource + ?Sized> PositionSource for Arc<T> {
    fn state(&self) -> SourceState {
        (**self).state()
    }

    fn sample(&self) -> Result<Option<Position>> {
        (**self).sample()
    }
}

/// Clamps sample timestamps so a source never delivers out-of-order fixes.
#[derive(Debug, Default)]
pub struct MonotonicStamp {
    last_ms: AtomicU64,
}

impl MonotonicStamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a sample, raising its timestamp to the latest one seen if needed.
    pub fn admit(&self, mut position: Position) -> Position {
        let previous = self
            .last_ms
            .fetch_max(position.timestamp_ms, Ordering::SeqCst);
        if position.timestamp_ms < previous {
            tracing::debug!(
                sample_ms = position.timestamp_ms,
                last_ms = previous,
                "clamping out-of-order position sample"
            );
            position.timestamp_ms = previous;
        }
        position
    }

    /// Latest timestamp admitted so far.
    pub fn last_ms(&self) -> u64 {
        self.last_ms.load(Ordering::SeqCst)
    }
}
