//! Straight-line path planner.
//!
//! There is no obstacle avoidance: the path is the straight segment from
//! start to destination, cut into evenly spaced waypoints, each snapped onto
//! the walkable surface beneath it when one can be found.

use crate::path::Path;
use crate::surface::SurfaceProber;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use wandur_position::Point3;

/// Upper bound on intermediate waypoints for a single plan.
pub const MAX_WAYPOINTS: usize = 4096;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    #[error("invalid planner config: {0}")]
    InvalidConfig(String),
}

/// Configuration for path planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Target spacing between waypoints (meters).
    pub waypoint_spacing: f64,
    /// How far above and below a waypoint to look for a surface (meters).
    pub probe_height: f64,
    /// Height at which waypoint markers float above the surface (meters).
    pub marker_offset: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            waypoint_spacing: 2.0,
            probe_height: 3.0,
            marker_offset: 0.1,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), PlannerError> {
        if !(self.waypoint_spacing.is_finite() && self.waypoint_spacing > 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "waypoint_spacing must be positive, got {}",
                self.waypoint_spacing
            )));
        }
        if !(self.probe_height.is_finite() && self.probe_height >= 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "probe_height must be non-negative, got {}",
                self.probe_height
            )));
        }
        if !self.marker_offset.is_finite() {
            return Err(PlannerError::InvalidConfig(
                "marker_offset must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Plans walking paths between two points.
#[derive(Clone)]
pub struct PathPlanner {
    config: PlannerConfig,
    prober: Arc<dyn SurfaceProber>,
}

impl PathPlanner {
    pub fn new(config: PlannerConfig, prober: Arc<dyn SurfaceProber>) -> Result<Self, PlannerError> {
        config.validate()?;
        Ok(Self { config, prober })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Revision of the surface set the planner snaps onto.
    pub fn surface_revision(&self) -> u64 {
        self.prober.revision()
    }

    /// Plan a fresh path from `start` to `destination`.
    ///
    /// With `n = floor(d / spacing)`, intermediate points sit at
    /// `t = i / (n + 1)` for `i` in `1..n`. When start and destination are
    /// closer than one spacing the path is just `[start, destination]`.
    pub fn plan(&self, start: Point3<f64>, destination: Point3<f64>, planned_at_ms: u64) -> Path {
        let delta = destination - start;
        let distance = delta.norm();

        let n = if distance.is_finite() {
            ((distance / self.config.waypoint_spacing).floor() as usize).min(MAX_WAYPOINTS + 1)
        } else {
            0
        };

        let mut points = Vec::with_capacity(n.max(1) + 1);
        points.push(start);
        let mut fallbacks = 0usize;
        for i in 1..n {
            let t = i as f64 / (n + 1) as f64;
            let raw = start + delta * t;
            let (point, snapped) = self.snap(raw);
            if !snapped {
                fallbacks += 1;
            }
            points.push(point);
        }
        points.push(destination);

        tracing::debug!(
            distance,
            waypoints = points.len() - 2,
            fallbacks,
            "planned path"
        );
        Path::new(points, planned_at_ms)
    }

    /// Snap a point onto the surface below it, or keep it with the marker offset.
    fn snap(&self, raw: Point3<f64>) -> (Point3<f64>, bool) {
        match self.prober.probe_ground(&raw, self.config.probe_height) {
            Some(ground) => (
                Point3::new(raw.x, ground.y + self.config.marker_offset, raw.z),
                true,
            ),
            None => {
                tracing::trace!(x = raw.x, z = raw.z, "surface probe missed, keeping raw point");
                (
                    Point3::new(raw.x, raw.y + self.config.marker_offset, raw.z),
                    false,
                )
            }
        }
    }
}

impl std::fmt::Debug for PathPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathPlanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{FlatFloor, NoSurface};

    fn planner(prober: impl SurfaceProber + 'static) -> PathPlanner {
        PathPlanner::new(PlannerConfig::default(), Arc::new(prober)).unwrap()
    }

    #[test]
    fn test_straight_corridor_has_nine_waypoints() {
        let path = planner(NoSurface).plan(Point3::origin(), Point3::new(0.0, 0.0, 20.0), 0);

        assert_eq!(path.waypoint_count(), 9);
        assert_eq!(path.points().len(), 11);
        assert_eq!(path.start(), Point3::origin());
        assert_eq!(path.destination(), Point3::new(0.0, 0.0, 20.0));

        let zs: Vec<f64> = path.points().iter().map(|p| p.z).collect();
        assert!(zs.windows(2).all(|w| w[1] > w[0]), "z not increasing: {:?}", zs);
    }

    #[test]
    fn test_zero_distance_is_degenerate() {
        let p = Point3::new(3.0, 0.0, 4.0);
        let path = planner(NoSurface).plan(p, p, 0);

        assert_eq!(path.points(), &[p, p]);
        assert_eq!(path.waypoint_count(), 0);
        assert!(path.waypoints().is_empty());
    }

    #[test]
    fn test_short_hop_has_no_waypoints() {
        let path = planner(NoSurface).plan(Point3::origin(), Point3::new(1.5, 0.0, 0.0), 0);
        assert_eq!(path.waypoint_count(), 0);
    }

    #[test]
    fn test_probe_miss_falls_back_to_marker_offset() {
        let path = planner(NoSurface).plan(Point3::origin(), Point3::new(0.0, 0.0, 20.0), 0);
        for w in path.waypoints() {
            assert!((w.y - 0.1).abs() < 1e-9);
        }
    }

    #[test]
    fn test_probe_hit_snaps_to_surface() {
        let path = planner(FlatFloor { height: -0.5 })
            .plan(Point3::origin(), Point3::new(10.0, 0.0, 0.0), 7);

        assert_eq!(path.planned_at_ms(), 7);
        assert!(path.waypoint_count() > 0);
        for w in path.waypoints() {
            assert!((w.y - (-0.4)).abs() < 1e-9);
        }
        // Endpoints are never snapped
        assert_eq!(path.start().y, 0.0);
        assert_eq!(path.destination().y, 0.0);
    }

    #[test]
    fn test_rejects_non_positive_spacing() {
        let config = PlannerConfig {
            waypoint_spacing: 0.0,
            ..Default::default()
        };
        assert!(PathPlanner::new(config, Arc::new(NoSurface)).is_err());
    }

    #[test]
    fn test_length_of_straight_path() {
        let path = planner(NoSurface).plan(Point3::origin(), Point3::new(0.0, 0.0, 20.0), 0);
        // Marker offset adds a little vertical zig-zag
        assert!(path.length() >= 20.0);
        assert!(path.length() < 20.5);
    }
}
