//! Position samples and the planar math shared by every subsystem.
//!
//! Coordinates follow the venue frame used by the AR layer: `y` is up and the
//! walking surface is the `x`/`z` plane. Headings are degrees clockwise from
//! the `+z` axis.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A single timestamped position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Location in venue coordinates (meters).
    pub point: Point3<f64>,

    /// Heading in degrees, always within `[0, 360)` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    /// Milliseconds since the source's epoch.
    pub timestamp_ms: u64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            point: Point3::new(x, y, z),
            heading: None,
            timestamp_ms,
        }
    }

    pub fn at(point: Point3<f64>, timestamp_ms: u64) -> Self {
        Self {
            point,
            heading: None,
            timestamp_ms,
        }
    }

    /// Attach a heading, wrapping it into `[0, 360)`.
    pub fn with_heading(mut self, degrees: f64) -> Self {
        self.heading = Some(normalize_heading(degrees));
        self
    }

    /// Ground-plane distance to a point, ignoring height.
    pub fn horizontal_distance_to(&self, other: &Point3<f64>) -> f64 {
        horizontal_distance(&self.point, other)
    }

    /// Full 3D Euclidean distance to a point.
    pub fn distance_to(&self, other: &Point3<f64>) -> f64 {
        nalgebra::distance(&self.point, other)
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_heading(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Distance between two points projected onto the walking plane.
pub fn horizontal_distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    (dx * dx + dz * dz).sqrt()
}

/// Heading of the horizontal direction from `from` to `to`.
///
/// Returns `None` when the points coincide on the walking plane.
pub fn bearing(from: &Point3<f64>, to: &Point3<f64>) -> Option<f64> {
    heading_of(&(to - from))
}

/// Heading of a direction vector, or `None` for a vertical/zero vector.
pub fn heading_of(direction: &Vector3<f64>) -> Option<f64> {
    if direction.x.abs() < f64::EPSILON && direction.z.abs() < f64::EPSILON {
        return None;
    }
    Some(normalize_heading(direction.x.atan2(direction.z).to_degrees()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_heading_wraps() {
        assert_eq!(normalize_heading(0.0), 0.0);
        assert_eq!(normalize_heading(360.0), 0.0);
        assert_eq!(normalize_heading(370.0), 10.0);
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(-720.0), 0.0);
        assert_eq!(normalize_heading(f64::NAN), 0.0);
    }

    #[test]
    fn test_horizontal_distance_ignores_height() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 10.0, 4.0);
        assert!((horizontal_distance(&a, &b) - 5.0).abs() < 1e-9);

        let p = Position::at(a, 0);
        assert!(p.distance_to(&b) > 5.0);
        assert!((p.horizontal_distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_is_clockwise_from_z() {
        let origin = Point3::origin();
        let north = bearing(&origin, &Point3::new(0.0, 0.0, 1.0)).unwrap();
        let east = bearing(&origin, &Point3::new(1.0, 0.0, 0.0)).unwrap();
        let west = bearing(&origin, &Point3::new(-1.0, 0.0, 0.0)).unwrap();

        assert!(north.abs() < 1e-9);
        assert!((east - 90.0).abs() < 1e-9);
        assert!((west - 270.0).abs() < 1e-9);
        assert!(bearing(&origin, &Point3::new(0.0, 5.0, 0.0)).is_none());
    }

    #[test]
    fn test_with_heading_normalizes() {
        let p = Position::new(1.0, 0.0, 1.0, 5).with_heading(-45.0);
        assert_eq!(p.heading, Some(315.0));
    }
}
