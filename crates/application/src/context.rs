//! The guidance application context.
//!
//! [`GuidanceContext`] is constructed explicitly and passed by reference. It
//! owns the navigator and the geofence registry, each behind its own lock,
//! and drives them from the shared position source with two independent
//! repeating tasks:
//! - the geofence loop runs whenever it is started, navigating or not
//! - a navigation loop exists per session and ends with it (stop, supersede
//!   or arrival)
//!
//! Neither subsystem reads the other's state; they only share the position
//! source and the event bus.

use crate::config::{AppConfig, ConfigError};
use crate::scheduler::{RepeatingTask, TickControl};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use wandur_events::{EventBusRef, GuidanceEvent, NavigationEndedEvent};
use wandur_geofence::{GeofenceError, GeofenceRegistry, GeofenceZone, ZoneEvent};
use wandur_navigation::{
    DestinationResolver, NavigationError, NavigationState, Navigator,
};
use wandur_planner::{PathPlanner, PlannerError, SurfaceProber};
use wandur_position::{Position, PositionError, PositionSource, PositionSourceRef};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Geofence(#[from] GeofenceError),
}

pub struct GuidanceContext {
    config: AppConfig,
    source: PositionSourceRef,
    navigator: Arc<Mutex<Navigator>>,
    geofence: Arc<Mutex<GeofenceRegistry>>,
    bus: EventBusRef,
    geofence_task: Mutex<Option<RepeatingTask>>,
    navigation_task: Mutex<Option<RepeatingTask>>,
}

impl GuidanceContext {
    pub fn new(
        config: AppConfig,
        source: PositionSourceRef,
        resolver: Arc<dyn DestinationResolver>,
        surfaces: Arc<dyn SurfaceProber>,
        bus: EventBusRef,
    ) -> Result<Self, ContextError> {
        config.validate()?;
        let planner = PathPlanner::new(config.planner.clone(), surfaces)?;
        let navigator = Navigator::new(
            config.navigation.clone(),
            planner,
            resolver,
            Arc::clone(&bus),
        )?;
        let geofence = GeofenceRegistry::new(Arc::clone(&bus));

        Ok(Self {
            config,
            source,
            navigator: Arc::new(Mutex::new(navigator)),
            geofence: Arc::new(Mutex::new(geofence)),
            bus,
            geofence_task: Mutex::new(None),
            navigation_task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn source(&self) -> &PositionSourceRef {
        &self.source
    }

    pub fn bus(&self) -> &EventBusRef {
        &self.bus
    }

    /// Lock the navigator for inspection.
    pub fn navigator(&self) -> MutexGuard<'_, Navigator> {
        lock(&self.navigator)
    }

    /// Lock the geofence registry for inspection.
    pub fn geofence(&self) -> MutexGuard<'_, GeofenceRegistry> {
        lock(&self.geofence)
    }

    // ------------------------------------------------------------------------
    // Zones
    // ------------------------------------------------------------------------

    pub fn add_zone(&self, zone: GeofenceZone) -> Result<(), GeofenceError> {
        self.geofence().add_zone(zone)
    }

    /// Add several zones, stopping at the first invalid one.
    pub fn add_zones(&self, zones: impl IntoIterator<Item = GeofenceZone>) -> Result<usize, GeofenceError> {
        let mut registry = self.geofence();
        let mut added = 0;
        for zone in zones {
            registry.add_zone(zone)?;
            added += 1;
        }
        Ok(added)
    }

    pub fn remove_zone(&self, zone_id: &str) -> Result<Vec<ZoneEvent>, GeofenceError> {
        self.geofence().remove_zone(zone_id)
    }

    pub fn set_zone_active(&self, zone_id: &str, active: bool) -> Result<Vec<ZoneEvent>, GeofenceError> {
        self.geofence().set_active(zone_id, active)
    }

    // ------------------------------------------------------------------------
    // Loops
    // ------------------------------------------------------------------------

    /// Start evaluating zones on the configured cadence. No-op if running.
    pub fn start_geofence(&self) {
        let mut slot = lock(&self.geofence_task);
        if slot.as_ref().is_some_and(|t| !t.is_finished()) {
            tracing::warn!("geofence loop already running");
            return;
        }

        let source = Arc::clone(&self.source);
        let registry = Arc::clone(&self.geofence);
        let period = self.config.geofence.tick_interval();
        tracing::info!(?period, "starting geofence loop");

        *slot = Some(RepeatingTask::spawn("geofence", period, move || {
            if let Some(position) = poll(&*source) {
                lock(&registry).evaluate(&position);
            }
            TickControl::Continue
        }));
    }

    pub fn stop_geofence(&self) {
        if let Some(task) = lock(&self.geofence_task).take() {
            task.cancel();
            tracing::info!("geofence loop stopped");
        }
    }

    pub fn is_geofence_running(&self) -> bool {
        lock(&self.geofence_task)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Start navigating to `store_id` and spawn the session's loop.
    ///
    /// An active session is superseded. On error nothing changes: any
    /// active session and its loop keep running.
    pub fn start_navigation(&self, store_id: &str) -> Result<String, NavigationError> {
        // Lock order: task slot, then navigator. The slot stays held so the
        // stored loop always belongs to the session started here.
        let mut slot = lock(&self.navigation_task);
        let session_id = self.navigator().start(store_id, &*self.source)?;
        let task = self.spawn_navigation_loop(session_id.clone());

        if let Some(previous) = slot.replace(task) {
            previous.cancel();
        }
        Ok(session_id)
    }

    /// Cancel the active session and halt its loop.
    ///
    /// The remaining distance is measured from a fresh sample when one is
    /// available. Returns `None` when not navigating.
    pub fn stop_navigation(&self) -> Option<NavigationEndedEvent> {
        let mut slot = lock(&self.navigation_task);
        if let Some(task) = slot.take() {
            task.cancel();
        }

        let current = poll(&*self.source);
        let mut navigator = self.navigator();
        match current {
            Some(position) => navigator.stop_at(position),
            None => navigator.stop(),
        }
    }

    pub fn update_destination(&self, store_id: &str) -> Result<(), NavigationError> {
        self.navigator().update_destination(store_id)
    }

    /// Tell the navigator that walkable surfaces changed.
    pub fn notify_surfaces_changed(&self) {
        self.navigator().notify_surfaces_changed();
    }

    pub fn navigation_state(&self) -> NavigationState {
        self.navigator().state()
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.navigator().session().map(|s| s.id().to_string())
    }

    pub fn is_navigation_running(&self) -> bool {
        lock(&self.navigation_task)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Poll once and feed the sample to both subsystems synchronously.
    ///
    /// Returns the events published, navigation first. Does not require
    /// the loops to be running.
    pub fn tick_once(&self) -> Vec<GuidanceEvent> {
        let Some(position) = poll(&*self.source) else {
            return Vec::new();
        };

        let mut events = self.navigator().tick(&position);
        events.extend(
            self.geofence()
                .evaluate(&position)
                .into_iter()
                .map(GuidanceEvent::from),
        );
        events
    }

    /// Cancel navigation (publishing its end) and stop the geofence loop.
    pub fn shutdown(&self) {
        self.stop_navigation();
        self.stop_geofence();
    }

    fn spawn_navigation_loop(&self, session_id: String) -> RepeatingTask {
        let source = Arc::clone(&self.source);
        let navigator = Arc::clone(&self.navigator);
        let period = self.config.position.poll_interval();

        RepeatingTask::spawn(format!("navigation:{session_id}"), period, move || {
            let Some(position) = poll(&*source) else {
                return TickControl::Continue;
            };

            let mut navigator = lock(&navigator);
            if navigator.session().map(|s| s.id()) != Some(session_id.as_str()) {
                return TickControl::Stop;
            }
            navigator.tick(&position);

            if navigator.is_navigating() {
                TickControl::Continue
            } else {
                tracing::debug!(session_id = %session_id, "navigation loop finished");
                TickControl::Stop
            }
        })
    }
}

impl std::fmt::Debug for GuidanceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidanceContext")
            .field("geofence_running", &self.is_geofence_running())
            .field("navigation_running", &self.is_navigation_running())
            .finish_non_exhaustive()
    }
}

/// Latest fix, or `None` when the source is not ready or has no fix.
fn poll(source: &dyn PositionSource) -> Option<Position> {
    if !source.state().is_ready() {
        tracing::trace!("position source not ready, skipping tick");
        return None;
    }
    match source.sample() {
        Ok(position) => position,
        Err(PositionError::NotReady) => None,
        Err(e) => {
            tracing::warn!(error = %e, "position sample failed");
            None
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
