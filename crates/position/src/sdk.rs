//! Position source backed by an indoor positioning SDK.
//!
//! The SDK itself is a black box behind [`PositioningSdk`]. Initialization is
//! the only long-latency step: it runs once per attempt under a bounded
//! timeout and either succeeds or fails. Nothing here retries; a failed
//! source stays unusable until the caller calls `initialize` again.

use crate::error::{PositionError, Result};
use crate::sample::Position;
use crate::source::{MonotonicStamp, PositionSource, SourceState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Default bound on SDK initialization.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Credentials identifying the venue to the positioning service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdkCredentials {
    pub api_key: String,
    pub venue_id: String,
}

impl SdkCredentials {
    pub fn new(api_key: impl Into<String>, venue_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            venue_id: venue_id.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PositionError::MissingCredentials { field: "api_key" });
        }
        if self.venue_id.trim().is_empty() {
            return Err(PositionError::MissingCredentials { field: "venue_id" });
        }
        Ok(())
    }
}

/// The vendor positioning SDK.
#[async_trait]
pub trait PositioningSdk: Send + Sync {
    /// Connect to the venue. An `Err` carries the vendor's reason.
    async fn initialize(&self, api_key: &str, venue_id: &str) -> std::result::Result<(), String>;

    /// Latest fix, once initialized.
    fn current_position(&self) -> Option<Position>;
}

/// A [`PositionSource`] wrapping a [`PositioningSdk`].
pub struct SdkPositionSource<S> {
    sdk: S,
    state: Mutex<SourceState>,
    stamp: MonotonicStamp,
    init_timeout: Duration,
}

impl<S: PositioningSdk> SdkPositionSource<S> {
    pub fn new(sdk: S) -> Self {
        Self::with_timeout(sdk, DEFAULT_INIT_TIMEOUT)
    }

    pub fn with_timeout(sdk: S, init_timeout: Duration) -> Self {
        Self {
            sdk,
            state: Mutex::new(SourceState::NotReady),
            stamp: MonotonicStamp::new(),
            init_timeout,
        }
    }

    /// Initialize the SDK for a venue.
    ///
    /// Succeeds immediately if already ready. A concurrent call while an
    /// attempt is running is rejected rather than queued.
    pub async fn initialize(&self, credentials: &SdkCredentials) -> Result<()> {
        {
            let mut state = self.lock_state();
            match *state {
                SourceState::Ready => return Ok(()),
                SourceState::Initializing => return Err(PositionError::InitializationInProgress),
                _ => {}
            }

            if let Err(e) = credentials.validate() {
                tracing::warn!(error = %e, "positioning credentials rejected");
                *state = SourceState::Failed {
                    reason: e.to_string(),
                };
                return Err(e);
            }
            *state = SourceState::Initializing;
        }
        let mut attempt_guard = AttemptGuard {
            state: &self.state,
            settled: false,
        };

        tracing::info!(venue_id = %credentials.venue_id, "initializing positioning SDK");

        let attempt = tokio::time::timeout(
            self.init_timeout,
            self.sdk
                .initialize(&credentials.api_key, &credentials.venue_id),
        )
        .await;

        let result = match attempt {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(PositionError::InitializationFailed { reason }),
            Err(_) => Err(PositionError::InitializationTimeout {
                timeout_ms: self.init_timeout.as_millis() as u64,
            }),
        };

        attempt_guard.settled = true;
        let mut state = self.lock_state();
        match &result {
            Ok(()) => {
                tracing::info!(venue_id = %credentials.venue_id, "positioning SDK ready");
                *state = SourceState::Ready;
            }
            Err(e) => {
                tracing::warn!(error = %e, "positioning SDK initialization failed");
                *state = SourceState::Failed {
                    reason: e.to_string(),
                };
            }
        }
        result
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Puts an abandoned attempt back to `NotReady` so the caller can retry.
///
/// `initialize` may be dropped mid-await by an outer timeout or `select!`.
struct AttemptGuard<'a> {
    state: &'a Mutex<SourceState>,
    settled: bool,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == SourceState::Initializing {
            tracing::warn!("positioning SDK initialization abandoned");
            *state = SourceState::NotReady;
        }
    }
}

impl<S: PositioningSdk> PositionSource for SdkPositionSource<S> {
    fn state(&self) -> SourceState {
        self.lock_state().clone()
    }

    fn sample(&self) -> Result<Option<Position>> {
        if !self.lock_state().is_ready() {
            return Err(PositionError::NotReady);
        }
        Ok(self.sdk.current_position().map(|p| self.stamp.admit(p)))
    }
}
