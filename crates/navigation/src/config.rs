//! Navigation thresholds and cadence.

use crate::error::{NavigationError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for navigation sessions.
///
/// All radii are horizontal (ground-plane) distances in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Soft warning radius around the destination.
    pub close_radius: f64,
    /// Radius within which an intermediate waypoint counts as reached.
    pub waypoint_radius: f64,
    /// Terminal radius; must be smaller than `close_radius`.
    pub arrival_radius: f64,
    /// Replan cadence while navigating.
    pub replan_interval_ms: u64,
    /// Re-arm the close-to-destination warning when the destination changes mid-session.
    pub rearm_close_on_update: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            close_radius: 5.0,
            waypoint_radius: 2.0,
            arrival_radius: 1.5,
            replan_interval_ms: 1000,
            rearm_close_on_update: false,
        }
    }
}

impl NavigationConfig {
    pub fn replan_interval(&self) -> Duration {
        Duration::from_millis(self.replan_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let radii = [
            ("close_radius", self.close_radius),
            ("waypoint_radius", self.waypoint_radius),
            ("arrival_radius", self.arrival_radius),
        ];
        for (name, value) in radii {
            if !(value.is_finite() && value > 0.0) {
                return Err(NavigationError::InvalidConfig {
                    message: format!("{name} must be positive, got {value}"),
                });
            }
        }
        if self.arrival_radius >= self.close_radius {
            return Err(NavigationError::InvalidConfig {
                message: format!(
                    "arrival_radius ({}) must be smaller than close_radius ({})",
                    self.arrival_radius, self.close_radius
                ),
            });
        }
        if self.replan_interval_ms == 0 {
            return Err(NavigationError::InvalidConfig {
                message: "replan_interval_ms must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(NavigationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_arrival_must_be_inside_close_radius() {
        let config = NavigationConfig {
            arrival_radius: 5.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NavigationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = NavigationConfig {
            replan_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NavigationConfig = serde_json::from_str(r#"{"close_radius": 8.0}"#).unwrap();
        assert_eq!(config.close_radius, 8.0);
        assert_eq!(config.arrival_radius, 1.5);
    }
}
