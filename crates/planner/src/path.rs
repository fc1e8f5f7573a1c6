//! Planned walking path.

use serde::{Deserialize, Serialize};
use wandur_position::Point3;

/// An ordered sequence of points from the walker to the destination.
///
/// Always holds at least two points: the first is the position the path was
/// planned from and the last is the destination. Paths are never edited in
/// place; a replan produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    points: Vec<Point3<f64>>,
    planned_at_ms: u64,
}

impl Path {
    pub(crate) fn new(points: Vec<Point3<f64>>, planned_at_ms: u64) -> Self {
        debug_assert!(points.len() >= 2);
        Self {
            points,
            planned_at_ms,
        }
    }

    pub fn start(&self) -> Point3<f64> {
        self.points[0]
    }

    pub fn destination(&self) -> Point3<f64> {
        self.points[self.points.len() - 1]
    }

    /// Every point including start and destination.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Intermediate waypoints only.
    pub fn waypoints(&self) -> &[Point3<f64>] {
        &self.points[1..self.points.len() - 1]
    }

    pub fn waypoint_count(&self) -> usize {
        self.points.len() - 2
    }

    /// Sample timestamp the path was planned at.
    pub fn planned_at_ms(&self) -> u64 {
        self.planned_at_ms
    }

    /// Total polyline length.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }
}
