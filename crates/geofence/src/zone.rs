//! Geofence zone definition.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use wandur_position::{horizontal_distance, Point3};

/// Default minimum time between two ads for the same zone.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// A named circular zone on the walking plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceZone {
    /// Zone identifier
    pub id: String,
    /// Center; only `x` and `z` matter for containment
    pub center: Point3<f64>,
    /// Radius in meters
    pub radius: f64,
    /// Inactive zones are skipped during evaluation
    #[serde(default = "default_active")]
    pub active: bool,
    /// Minimum time between ad triggers (ms)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Free-form labels (e.g. "sale", "food")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

fn default_active() -> bool {
    true
}

fn default_cooldown_ms() -> u64 {
    DEFAULT_COOLDOWN.as_millis() as u64
}

impl GeofenceZone {
    /// Create an active zone with the default cooldown.
    pub fn new(id: impl Into<String>, center: Point3<f64>, radius: f64) -> Self {
        Self {
            id: id.into(),
            center,
            radius,
            active: true,
            cooldown_ms: default_cooldown_ms(),
            tags: Vec::new(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_ms = cooldown.as_millis() as u64;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Horizontal distance from the zone center.
    pub fn distance_to(&self, point: &Point3<f64>) -> f64 {
        horizontal_distance(&self.center, point)
    }

    /// Whether `point` lies inside the zone (boundary included).
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        self.distance_to(point) <= self.radius
    }
}
