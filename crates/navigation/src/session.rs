//! Per-session navigation state.

use crate::destination::Destination;
use serde::{Deserialize, Serialize};
use wandur_planner::Path;
use wandur_position::{horizontal_distance, Point3, Position};

/// Lifecycle of the navigator.
///
/// `Arrived` and `Cancelled` are terminal for a session; the next `start`
/// creates a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationState {
    #[default]
    Idle,
    Navigating,
    Arrived,
    Cancelled,
}

/// Why a replan happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplanReason {
    Interval,
    SurfacesChanged,
}

/// State owned by one navigation session.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    pub(crate) id: String,
    pub(crate) destination: Destination,
    pub(crate) path: Path,
    pub(crate) started_at_ms: u64,
    pub(crate) last_position: Position,
    pub(crate) last_replan_ms: u64,
    pub(crate) surface_revision: u64,
    pub(crate) replan_pending: bool,
    /// Close-to-destination already reported.
    pub(crate) close_notified: bool,
    /// Index into the current path's waypoints of the next candidate.
    pub(crate) next_waypoint: usize,
    /// Waypoints reported so far in this session.
    pub(crate) waypoints_reached: u32,
}

impl NavigationSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    pub fn last_position(&self) -> &Position {
        &self.last_position
    }

    pub fn close_notified(&self) -> bool {
        self.close_notified
    }

    pub fn waypoints_reached(&self) -> u32 {
        self.waypoints_reached
    }

    /// Horizontal distance from the last known position to the destination.
    pub fn remaining_distance(&self) -> f64 {
        self.distance_from(&self.last_position.point)
    }

    pub(crate) fn distance_from(&self, point: &Point3<f64>) -> f64 {
        horizontal_distance(point, &self.destination.point)
    }

    /// First unreached waypoint, in path order, within `radius` of `point`.
    ///
    /// Marks it and every earlier waypoint as passed so nothing is reported
    /// twice or out of order.
    pub(crate) fn take_reached_waypoint(
        &mut self,
        point: &Point3<f64>,
        radius: f64,
    ) -> Option<Point3<f64>> {
        let candidates = self.path.waypoints().get(self.next_waypoint..)?;
        let offset = candidates
            .iter()
            .position(|w| horizontal_distance(point, w) <= radius)?;

        let waypoint = candidates[offset];
        self.next_waypoint += offset + 1;
        self.waypoints_reached += 1;
        Some(waypoint)
    }

    /// Swap in a freshly planned path.
    ///
    /// Waypoints already within `radius` of the path's start are passed over:
    /// the walker is standing on them, so they are not progress.
    pub(crate) fn install_path(&mut self, path: Path, revision: u64, radius: f64) {
        self.last_replan_ms = path.planned_at_ms();
        self.next_waypoint = skip_near_start(&path, radius);
        self.path = path;
        self.surface_revision = revision;
        self.replan_pending = false;
    }

    pub(crate) fn replan_reason(&self, now_ms: u64, interval_ms: u64, revision: u64) -> Option<ReplanReason> {
        if self.replan_pending || revision != self.surface_revision {
            Some(ReplanReason::SurfacesChanged)
        } else if now_ms.saturating_sub(self.last_replan_ms) >= interval_ms {
            Some(ReplanReason::Interval)
        } else {
            None
        }
    }
}

/// Number of leading waypoints within `radius` of where `path` was planned from.
pub(crate) fn skip_near_start(path: &Path, radius: f64) -> usize {
    let start = path.start();
    path.waypoints()
        .iter()
        .take_while(|w| horizontal_distance(&start, w) <= radius)
        .count()
}
