//! Proximity monitoring for indoor guidance.
//!
//! A [`GeofenceRegistry`] holds named circular zones and evaluates every
//! position sample against them, independent of navigation:
//! - walking in reports `ZoneEntered` every time
//! - an ad fires on entry only when the zone's cooldown has elapsed
//! - walking out reports `ZoneExited` and always tears down a displayed ad

mod error;
mod registry;
mod zone;

pub use error::{GeofenceError, Result};
pub use registry::{GeofenceRegistry, ZoneEvent};
pub use zone::{GeofenceZone, DEFAULT_COOLDOWN};
