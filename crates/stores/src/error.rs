//! Error types for loading the store catalog.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read the catalog file.
    #[error("Failed to read store catalog '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not valid JSON or has the wrong shape.
    #[error("Invalid store catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two stores share an id.
    #[error("Duplicate store id '{id}'")]
    DuplicateStore { id: String },

    /// A store's geofence radius is not a positive number.
    #[error("Invalid geofence radius {radius} for store '{id}'")]
    InvalidRadius { id: String, radius: f64 },
}
