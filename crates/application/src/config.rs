//! Application configuration.
//!
//! One JSON document with a section per subsystem. Every section and every
//! field is optional; missing values take their defaults.
//!
//! ```json
//! {
//!   "position": { "poll_interval_ms": 100, "venue_id": "galleria-north" },
//!   "navigation": { "close_radius": 6.0 },
//!   "geofence": { "default_cooldown_secs": 120 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use wandur_navigation::NavigationConfig;
use wandur_planner::PlannerConfig;
use wandur_position::{SdkCredentials, SimulationConfig, DEFAULT_INIT_TIMEOUT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Cadence of the navigation loop (ms).
    pub poll_interval_ms: u64,
    /// Bound on SDK initialization (ms).
    pub init_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            init_timeout_ms: DEFAULT_INIT_TIMEOUT.as_millis() as u64,
            api_key: None,
            venue_id: None,
        }
    }
}

impl PositionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    /// SDK credentials; empty fields are left for the SDK source to reject.
    pub fn credentials(&self) -> SdkCredentials {
        SdkCredentials::new(
            self.api_key.clone().unwrap_or_default(),
            self.venue_id.clone().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    /// Cadence of the geofence loop (ms).
    pub tick_interval_ms: u64,
    /// Cooldown for zones generated from the store catalog (s).
    pub default_cooldown_secs: u64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            default_cooldown_secs: 300,
        }
    }
}

impl GeofenceConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn default_cooldown(&self) -> Duration {
        Duration::from_secs(self.default_cooldown_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub position: PositionConfig,
    pub planner: PlannerConfig,
    pub navigation: NavigationConfig,
    pub geofence: GeofenceConfig,
    pub simulation: SimulationConfig,
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.planner
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.navigation
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.position.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "position.poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.position.init_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "position.init_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.geofence.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "geofence.tick_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.simulation.step_ms == 0 {
            return Err(ConfigError::Invalid(
                "simulation.step_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
