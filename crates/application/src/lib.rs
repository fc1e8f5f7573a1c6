//! Application layer for wandur guidance.
//!
//! - [`AppConfig`]: JSON configuration for every subsystem
//! - [`RepeatingTask`]: cancellable periodic loop on the tokio runtime
//! - [`GuidanceContext`]: explicit application context running the
//!   navigation and geofence loops over one position source

mod config;
mod context;
mod scheduler;

pub use config::{AppConfig, ConfigError, GeofenceConfig, PositionConfig};
pub use context::{ContextError, GuidanceContext};
pub use scheduler::{RepeatingTask, TickControl};
