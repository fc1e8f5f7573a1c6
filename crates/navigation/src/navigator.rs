//! The navigation state machine.
//!
//! ```text
//! Idle ──start──▶ Navigating ──arrival──▶ Arrived
//!                   │   ▲                   │
//!                   │   └──────start────────┤
//!        stop/start │                       │
//!                   ▼                       │
//!               Cancelled ◀─────────────────┘ (start again → Navigating)
//! ```
//!
//! One session at most is active. Starting a new one cancels the current
//! session first, publishing its `NavigationEnded`. After a terminal
//! `NavigationEnded` a session publishes nothing more.

use crate::config::NavigationConfig;
use crate::destination::{Destination, DestinationResolver};
use crate::error::{NavigationError, Result};
use crate::session::{skip_near_start, NavigationSession, NavigationState};
use std::sync::Arc;
use wandur_events::{
    CloseToDestinationEvent, EventBusRef, GuidanceEvent, NavigationEndedEvent,
    NavigationStartedEvent, WaypointReachedEvent,
};
use wandur_planner::PathPlanner;
use wandur_position::{Position, PositionError, PositionSource};

/// Owns the active navigation session and drives it from position samples.
pub struct Navigator {
    config: NavigationConfig,
    planner: PathPlanner,
    resolver: Arc<dyn DestinationResolver>,
    bus: EventBusRef,
    session: Option<NavigationSession>,
    state: NavigationState,
}

impl Navigator {
    pub fn new(
        config: NavigationConfig,
        planner: PathPlanner,
        resolver: Arc<dyn DestinationResolver>,
        bus: EventBusRef,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            planner,
            resolver,
            bus,
            session: None,
            state: NavigationState::Idle,
        })
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Current lifecycle state. Stays `Arrived`/`Cancelled` until the next start.
    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn is_navigating(&self) -> bool {
        self.session.is_some()
    }

    /// The active session, if any.
    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    /// Start navigating to `store_id` from the source's current fix.
    ///
    /// Fails without touching any existing session when the destination is
    /// unknown or the source has no fix.
    pub fn start(&mut self, store_id: &str, source: &dyn PositionSource) -> Result<String> {
        let destination = self.resolve(store_id)?;

        if !source.state().is_ready() {
            return Err(NavigationError::PositionSourceNotReady);
        }
        let start = match source.sample() {
            Ok(Some(position)) => position,
            Ok(None) => return Err(NavigationError::PositionUnknown),
            Err(PositionError::NotReady) => return Err(NavigationError::PositionSourceNotReady),
            Err(e) => {
                tracing::warn!(error = %e, "position source failed while starting navigation");
                return Err(NavigationError::PositionSourceNotReady);
            }
        };

        Ok(self.begin(destination, start))
    }

    /// Start navigating to `store_id` from a known position.
    pub fn start_from(&mut self, store_id: &str, start: Position) -> Result<String> {
        let destination = self.resolve(store_id)?;
        Ok(self.begin(destination, start))
    }

    /// Cancel the active session using its last known position.
    ///
    /// Returns the published end event, or `None` when idle.
    pub fn stop(&mut self) -> Option<NavigationEndedEvent> {
        self.cancel(None)
    }

    /// Cancel the active session, measuring the remaining distance from `current`.
    pub fn stop_at(&mut self, current: Position) -> Option<NavigationEndedEvent> {
        self.cancel(Some(current))
    }

    /// Point the active session at a different store and replan at once.
    pub fn update_destination(&mut self, store_id: &str) -> Result<()> {
        if self.session.is_none() {
            return Err(NavigationError::NotNavigating);
        }
        let destination = self.resolve(store_id)?;
        let revision = self.planner.surface_revision();

        let Some(session) = self.session.as_mut() else {
            return Err(NavigationError::NotNavigating);
        };
        let from = session.last_position;
        let path = self
            .planner
            .plan(from.point, destination.point, from.timestamp_ms);

        tracing::info!(
            session_id = %session.id,
            from = %session.destination.store_id,
            to = %destination.store_id,
            "navigation destination updated"
        );
        session.destination = destination;
        session.install_path(path, revision, self.config.waypoint_radius);
        if self.config.rearm_close_on_update {
            session.close_notified = false;
        }
        Ok(())
    }

    /// Force a replan on the next tick, e.g. after new surfaces were detected.
    pub fn notify_surfaces_changed(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.replan_pending = true;
        }
    }

    /// Advance the active session with a new sample.
    ///
    /// Checks the close-to-destination and waypoint thresholds, then arrival,
    /// then replans when due. Returns the events published during this tick;
    /// empty when no session is active.
    pub fn tick(&mut self, position: &Position) -> Vec<GuidanceEvent> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        session.last_position = *position;
        let now = position.timestamp_ms;
        let remaining = session.distance_from(&position.point);
        let mut events = Vec::new();

        if !session.close_notified && remaining <= self.config.close_radius {
            session.close_notified = true;
            tracing::debug!(session_id = %session.id, distance = remaining, "close to destination");
            events.push(GuidanceEvent::CloseToDestination(CloseToDestinationEvent {
                session_id: session.id.clone(),
                store_id: session.destination.store_id.clone(),
                distance: remaining,
                timestamp_ms: now,
            }));
        }

        if let Some(waypoint) =
            session.take_reached_waypoint(&position.point, self.config.waypoint_radius)
        {
            tracing::trace!(
                session_id = %session.id,
                index = session.waypoints_reached,
                "waypoint reached"
            );
            events.push(GuidanceEvent::WaypointReached(WaypointReachedEvent {
                session_id: session.id.clone(),
                index: session.waypoints_reached,
                waypoint,
                distance: remaining,
                timestamp_ms: now,
            }));
        }

        if remaining <= self.config.arrival_radius {
            tracing::info!(
                session_id = %session.id,
                store_id = %session.destination.store_id,
                elapsed_ms = now.saturating_sub(session.started_at_ms),
                "arrived at destination"
            );
            events.push(GuidanceEvent::NavigationEnded(NavigationEndedEvent {
                session_id: session.id.clone(),
                store_id: session.destination.store_id.clone(),
                completed: true,
                remaining_distance: 0.0,
                timestamp_ms: now,
            }));
            self.session = None;
            self.state = NavigationState::Arrived;
            self.publish(&events);
            return events;
        }

        let revision = self.planner.surface_revision();
        if let Some(reason) =
            session.replan_reason(now, self.config.replan_interval_ms, revision)
        {
            let path = self
                .planner
                .plan(position.point, session.destination.point, now);
            tracing::trace!(
                session_id = %session.id,
                ?reason,
                waypoints = path.waypoint_count(),
                "replanned path"
            );
            session.install_path(path, revision, self.config.waypoint_radius);
        }

        self.publish(&events);
        events
    }

    fn resolve(&self, store_id: &str) -> Result<Destination> {
        self.resolver.resolve(store_id).ok_or_else(|| {
            tracing::warn!(store_id, "navigation destination not found");
            NavigationError::DestinationNotFound {
                store_id: store_id.to_string(),
            }
        })
    }

    fn begin(&mut self, destination: Destination, start: Position) -> String {
        if self.session.is_some() {
            tracing::debug!("superseding active navigation session");
            self.cancel(Some(start));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let path = self
            .planner
            .plan(start.point, destination.point, start.timestamp_ms);

        tracing::info!(
            session_id = %id,
            store_id = %destination.store_id,
            waypoints = path.waypoint_count(),
            "navigation started"
        );

        let event = GuidanceEvent::NavigationStarted(NavigationStartedEvent {
            session_id: id.clone(),
            store_id: destination.store_id.clone(),
            store_name: destination.store_name.clone(),
            start: start.point,
            destination: destination.point,
            timestamp_ms: start.timestamp_ms,
        });

        let next_waypoint = skip_near_start(&path, self.config.waypoint_radius);
        self.session = Some(NavigationSession {
            id: id.clone(),
            destination,
            last_replan_ms: path.planned_at_ms(),
            path,
            started_at_ms: start.timestamp_ms,
            last_position: start,
            surface_revision: self.planner.surface_revision(),
            replan_pending: false,
            close_notified: false,
            next_waypoint,
            waypoints_reached: 0,
        });
        self.state = NavigationState::Navigating;
        self.bus.publish(&event);
        id
    }

    fn cancel(&mut self, current: Option<Position>) -> Option<NavigationEndedEvent> {
        let mut session = self.session.take()?;
        if let Some(position) = current {
            if position.timestamp_ms >= session.last_position.timestamp_ms {
                session.last_position = position;
            }
        }

        let remaining = session.remaining_distance();
        tracing::info!(
            session_id = %session.id,
            store_id = %session.destination.store_id,
            remaining,
            "navigation cancelled"
        );

        let ended = NavigationEndedEvent {
            session_id: session.id,
            store_id: session.destination.store_id,
            completed: false,
            remaining_distance: remaining,
            timestamp_ms: session.last_position.timestamp_ms,
        };
        self.state = NavigationState::Cancelled;
        self.bus
            .publish(&GuidanceEvent::NavigationEnded(ended.clone()));
        Some(ended)
    }

    fn publish(&self, events: &[GuidanceEvent]) {
        for event in events {
            self.bus.publish(event);
        }
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("state", &self.state)
            .field("session", &self.session.as_ref().map(|s| s.id()))
            .finish_non_exhaustive()
    }
}
