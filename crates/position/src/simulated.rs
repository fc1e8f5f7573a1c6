//! Simulated walker for testing guidance without positioning hardware.
//!
//! The walker only moves when its owner calls [`SimulatedPositionSource::advance`],
//! one fixed step of simulated time per call. `sample` reads the latest state
//! and never moves it, so any number of pollers see the same track. By default it wanders: it walks at constant speed toward a random
//! nearby target and picks a new one once within `retarget_epsilon`, so the
//! track is continuous rather than teleporting. Manual input and goal
//! steering override the wander behaviour.

use crate::error::Result;
use crate::sample::{heading_of, horizontal_distance, normalize_heading, Position};
use crate::source::{PositionSource, SourceState};
use nalgebra::{Point3, Vector3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::sync::Mutex;

/// Configuration for the simulated walker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Starting point; its height is kept as the walking height.
    pub origin: [f64; 3],
    /// Half extent of the square area around the origin the walker stays in (meters).
    pub area_half_extent: f64,
    /// Maximum distance of a new wander target from the current point (meters).
    pub wander_radius: f64,
    /// Walking speed (m/s).
    pub walking_speed: f64,
    /// Distance at which the current target counts as reached (meters).
    pub retarget_epsilon: f64,
    /// Simulated time between samples (ms).
    pub step_ms: u64,
    /// RNG seed; 0 draws from entropy.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            area_half_extent: 50.0,
            wander_radius: 10.0,
            walking_speed: 1.2,
            retarget_epsilon: 0.3,
            step_ms: 100,
            seed: 0,
        }
    }
}

/// Manual motion input, in venue coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualInput {
    /// Velocity (m/s).
    pub velocity: Vector3<f64>,
    /// Heading change rate (degrees/s, clockwise positive).
    pub turn_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Steering {
    Wander,
    Manual(ManualInput),
    Goal(Point3<f64>),
}

#[derive(Debug)]
struct Walker {
    point: Point3<f64>,
    heading: f64,
    target: Point3<f64>,
    steering: Steering,
    clock_ms: u64,
    rng: SmallRng,
}

/// A position source driven by a simulated walker.
#[derive(Debug)]
pub struct SimulatedPositionSource {
    config: SimulationConfig,
    walker: Mutex<Walker>,
}

impl SimulatedPositionSource {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = if config.seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.seed)
        };
        let origin = Point3::from(config.origin);

        Self {
            walker: Mutex::new(Walker {
                point: origin,
                heading: 0.0,
                target: origin,
                steering: Steering::Wander,
                clock_ms: 0,
                rng,
            }),
            config,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Drive the walker manually until [`Self::wander`] or [`Self::steer_toward`].
    pub fn set_manual_input(&self, input: ManualInput) {
        self.walker().steering = Steering::Manual(input);
    }

    /// Walk straight toward `goal` and stop there.
    pub fn steer_toward(&self, goal: Point3<f64>) {
        let mut walker = self.walker();
        walker.steering = Steering::Goal(goal);
        walker.target = goal;
    }

    /// Return to random wandering.
    pub fn wander(&self) {
        let mut walker = self.walker();
        walker.steering = Steering::Wander;
        walker.target = walker.point;
    }

    /// Current simulated point, without advancing the clock.
    pub fn current_point(&self) -> Point3<f64> {
        self.walker().point
    }

    /// Simulated time of the latest state.
    pub fn clock_ms(&self) -> u64 {
        self.walker().clock_ms
    }

    /// Move the walker one step and return the new sample.
    pub fn advance(&self) -> Position {
        let mut walker = self.walker();
        self.step(&mut walker);
        Self::snapshot(&walker)
    }

    fn snapshot(walker: &Walker) -> Position {
        Position::at(walker.point, walker.clock_ms).with_heading(walker.heading)
    }

    fn walker(&self) -> std::sync::MutexGuard<'_, Walker> {
        self.walker.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn step(&self, walker: &mut Walker) {
        let dt = self.config.step_ms as f64 / 1000.0;
        walker.clock_ms += self.config.step_ms;

        match walker.steering {
            Steering::Manual(input) => {
                walker.point += input.velocity * dt;
                walker.heading = normalize_heading(walker.heading + input.turn_rate * dt);
            }
            Steering::Goal(goal) => {
                self.move_toward(walker, goal, dt);
            }
            Steering::Wander => {
                if horizontal_distance(&walker.point, &walker.target) <= self.config.retarget_epsilon
                {
                    walker.target = self.pick_target(walker);
                    tracing::trace!(
                        x = walker.target.x,
                        z = walker.target.z,
                        "simulated walker picked new target"
                    );
                }
                let target = walker.target;
                self.move_toward(walker, target, dt);
            }
        }
    }

    fn move_toward(&self, walker: &mut Walker, target: Point3<f64>, dt: f64) {
        let mut delta = target - walker.point;
        delta.y = 0.0;
        let remaining = delta.norm();
        if remaining <= f64::EPSILON {
            return;
        }

        let travel = (self.config.walking_speed * dt).min(remaining);
        walker.point += delta * (travel / remaining);
        if let Some(heading) = heading_of(&delta) {
            walker.heading = heading;
        }
    }

    fn pick_target(&self, walker: &mut Walker) -> Point3<f64> {
        let [ox, oy, oz] = self.config.origin;
        let extent = self.config.area_half_extent.max(0.0);
        let max_radius = self.config.wander_radius.max(self.config.retarget_epsilon * 2.0);

        let angle = walker.rng.gen_range(0.0..TAU);
        let radius = walker.rng.gen_range(max_radius * 0.25..=max_radius);

        let x = (walker.point.x + radius * angle.sin()).clamp(ox - extent, ox + extent);
        let z = (walker.point.z + radius * angle.cos()).clamp(oz - extent, oz + extent);
        Point3::new(x, oy, z)
    }
}

impl PositionSource for SimulatedPositionSource {
    fn state(&self) -> SourceState {
        SourceState::Ready
    }

    fn sample(&self) -> Result<Option<Position>> {
        Ok(Some(Self::snapshot(&self.walker())))
    }
}
