//! Deterministic replay of a fixed list of fixes.

use crate::error::Result;
use crate::sample::Position;
use crate::source::{MonotonicStamp, PositionSource, SourceState};
use std::sync::Mutex;

/// Replays a fixed sequence of samples, one per call to `sample`.
///
/// Once the script is exhausted the final sample is repeated. An empty
/// script behaves like a ready source without a fix.
#[derive(Debug)]
pub struct ScriptedPositionSource {
    samples: Vec<Position>,
    cursor: Mutex<usize>,
    stamp: MonotonicStamp,
}

impl ScriptedPositionSource {
    pub fn new(samples: Vec<Position>) -> Self {
        Self {
            samples,
            cursor: Mutex::new(0),
            stamp: MonotonicStamp::new(),
        }
    }

    /// Number of samples not yet delivered.
    pub fn remaining(&self) -> usize {
        let cursor = *self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        self.samples.len().saturating_sub(cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

impl PositionSource for ScriptedPositionSource {
    fn state(&self) -> SourceState {
        SourceState::Ready
    }

    fn sample(&self) -> Result<Option<Position>> {
        let Some(last) = self.samples.len().checked_sub(1) else {
            return Ok(None);
        };

        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let index = (*cursor).min(last);
        if *cursor <= last {
            *cursor += 1;
        }

        Ok(Some(self.stamp.admit(self.samples[index])))
    }
}
