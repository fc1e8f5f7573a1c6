//! Error types for geofence configuration.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    #[error("zone '{zone_id}' already exists")]
    DuplicateZone { zone_id: String },

    #[error("zone '{zone_id}' not found")]
    UnknownZone { zone_id: String },

    #[error("zone '{zone_id}' has invalid radius {radius}")]
    InvalidRadius { zone_id: String, radius: f64 },
}

pub type Result<T> = std::result::Result<T, GeofenceError>;
