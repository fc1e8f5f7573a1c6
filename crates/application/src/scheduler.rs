//! Cancellable repeating tasks.
//!
//! A [`RepeatingTask`] runs a synchronous tick closure on a fixed period on
//! the tokio runtime until it is cancelled, dropped, or the closure returns
//! [`TickControl::Stop`].

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What the loop does after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Handle to a periodic loop. Dropping it cancels the loop.
pub struct RepeatingTask {
    name: String,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    /// Spawn a loop ticking every `period`, first tick immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(name: impl Into<String>, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        let name = name.into();
        let token = CancellationToken::new();
        let cancelled = token.child_token();
        let period = period.max(Duration::from_millis(1));
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            tracing::debug!(task = %task_name, ?period, "repeating task started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if cancelled.is_cancelled() {
                    break;
                }

                ticks += 1;
                if tick() == TickControl::Stop {
                    break;
                }
            }

            tracing::debug!(task = %task_name, ticks, "repeating task stopped");
        });

        Self {
            name,
            token,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the loop. No tick starts after this returns.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the loop has exited, by cancellation or by returning `Stop`.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the loop to exit on its own.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(task = %self.name, error = %e, "repeating task panicked");
            }
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for RepeatingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepeatingTask")
            .field("name", &self.name)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
