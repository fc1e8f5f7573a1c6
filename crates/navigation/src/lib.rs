//! Navigation sessions for indoor guidance.
//!
//! A [`Navigator`] plans a walking path to a store, replans it on a fixed
//! cadence or when the walkable surfaces change, and publishes progress
//! events (close to destination, waypoint reached, arrival) on the event bus.
//!
//! All proximity checks use horizontal distance so the height at which path
//! markers float never affects arrival.

mod config;
mod destination;
mod error;
mod navigator;
mod session;

pub use config::NavigationConfig;
pub use destination::{Destination, DestinationResolver, StaticResolver};
pub use error::{NavigationError, Result};
pub use navigator::Navigator;
pub use session::{NavigationSession, NavigationState};
