//! Indoor position sources for wandur guidance.
//!
//! Normalizes indoor-positioning updates into a uniform stream of
//! [`Position`] samples:
//! - [`SdkPositionSource`] wraps a vendor positioning SDK
//! - [`SimulatedPositionSource`] walks a simulated visitor around the venue
//! - [`ScriptedPositionSource`] replays a fixed list of samples
//!
//! Every source delivers samples in non-decreasing timestamp order and
//! distinguishes "not ready" (an error) from "ready, no fix" (`Ok(None)`).

mod error;
mod sample;
mod scripted;
mod sdk;
mod simulated;
mod source;

pub use error::{PositionError, Result};
pub use sample::{bearing, heading_of, horizontal_distance, normalize_heading, Position};
pub use scripted::ScriptedPositionSource;
pub use sdk::{PositioningSdk, SdkCredentials, SdkPositionSource, DEFAULT_INIT_TIMEOUT};
pub use simulated::{ManualInput, SimulatedPositionSource, SimulationConfig};
pub use source::{MonotonicStamp, PositionSource, PositionSourceRef, SourceState};

pub use nalgebra::{Point3, Vector3};
