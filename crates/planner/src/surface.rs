//! Walkable-surface probing.
//!
//! The AR plane subsystem is an external collaborator; the planner only
//! needs to ask "what walkable surface lies under this point?" and to notice
//! when the set of known surfaces changes.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use wandur_position::Point3;

/// Probes for a walkable surface beneath a point.
pub trait SurfaceProber: Send + Sync {
    /// Cast a ray down from `search_height` above `point` to `search_height`
    /// below it and return the first surface point hit.
    fn probe_ground(&self, point: &Point3<f64>, search_height: f64) -> Option<Point3<f64>>;

    /// Counter bumped whenever the known surface set changes.
    fn revision(&self) -> u64 {
        0
    }
}

impl<T: SurfaceProber + ?Sized> SurfaceProber for Arc<T> {
    fn probe_ground(&self, point: &Point3<f64>, search_height: f64) -> Option<Point3<f64>> {
        (**self).probe_ground(point, search_height)
    }

    fn revision(&self) -> u64 {
        (**self).revision()
    }
}

/// Prober for venues with no surface information. Every probe misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSurface;

impl SurfaceProber for NoSurface {
    fn probe_ground(&self, _point: &Point3<f64>, _search_height: f64) -> Option<Point3<f64>> {
        None
    }
}

/// A single unbounded floor at a fixed height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatFloor {
    pub height: f64,
}

impl SurfaceProber for FlatFloor {
    fn probe_ground(&self, point: &Point3<f64>, search_height: f64) -> Option<Point3<f64>> {
        within_probe(point.y, self.height, search_height)
            .then(|| Point3::new(point.x, self.height, point.z))
    }
}

/// A horizontal walkable rectangle on the `x`/`z` plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Minimum corner as `[x, z]`.
    pub min: [f64; 2],
    /// Maximum corner as `[x, z]`.
    pub max: [f64; 2],
    /// Height of the surface.
    pub height: f64,
}

impl Surface {
    pub fn contains(&self, x: f64, z: f64) -> bool {
        x >= self.min[0] && x <= self.max[0] && z >= self.min[1] && z <= self.max[1]
    }
}

#[derive(Debug, Default)]
struct SurfaceSetInner {
    surfaces: Vec<Surface>,
    revision: u64,
}

/// Surfaces detected so far, shared between the plane detector and the planner.
#[derive(Debug, Default)]
pub struct SurfaceSet {
    inner: Mutex<SurfaceSetInner>,
}

impl SurfaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly detected surface.
    pub fn add(&self, surface: Surface) {
        let mut inner = self.lock();
        inner.surfaces.push(surface);
        inner.revision += 1;
        tracing::debug!(
            revision = inner.revision,
            height = surface.height,
            "walkable surface added"
        );
    }

    /// Forget every surface.
    pub fn clear(&self) {
        let mut inner = self.lock();
        if !inner.surfaces.is_empty() {
            inner.surfaces.clear();
            inner.revision += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().surfaces.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SurfaceSetInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SurfaceProber for SurfaceSet {
    fn probe_ground(&self, point: &Point3<f64>, search_height: f64) -> Option<Point3<f64>> {
        // The downward ray hits the highest surface in range first
        self.lock()
            .surfaces
            .iter()
            .filter(|s| s.contains(point.x, point.z))
            .filter(|s| within_probe(point.y, s.height, search_height))
            .map(|s| s.height)
            .max_by(f64::total_cmp)
            .map(|height| Point3::new(point.x, height, point.z))
    }

    fn revision(&self) -> u64 {
        self.lock().revision
    }
}

fn within_probe(origin_y: f64, surface_y: f64, search_height: f64) -> bool {
    (surface_y - origin_y).abs() <= search_height
}
