//! Store catalog for wandur guidance.
//!
//! The catalog maps store ids to names and entrance locations. It serves as
//! the navigation [`DestinationResolver`](wandur_navigation::DestinationResolver)
//! and seeds one geofence zone per store.

mod directory;
mod error;
mod store;

pub use directory::StoreDirectory;
pub use error::{Result, StoreError};
pub use store::{Store, StoreKind, DEFAULT_GEOFENCE_RADIUS, MALL_GEOFENCE_RADIUS};
