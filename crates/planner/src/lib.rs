//! Walking path planning for indoor guidance.
//!
//! Paths are straight-line decompositions snapped to the walkable surface;
//! see [`PathPlanner::plan`].

mod path;
mod planner;
mod surface;

pub use path::Path;
pub use planner::{PathPlanner, PlannerConfig, PlannerError, MAX_WAYPOINTS};
pub use surface::{FlatFloor, NoSurface, Surface, SurfaceProber, SurfaceSet};
