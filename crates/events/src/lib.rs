//! Shared event contracts for guidance collaborators.
//!
//! Navigation and geofencing publish these events; the renderer, UI and
//! analytics consume them. Using shared types keeps producers and consumers
//! agreeing on field names.
//!
//! Also provides the [`EventBus`] trait for decoupled event emission.

mod bus;

pub use bus::{
    EventBus, EventBusRef, EventHandler, InMemoryEventBus, LocalEventBus, NullEventBus,
    Subscription,
};

use serde::{Deserialize, Serialize};
use wandur_position::Point3;

/// Event emitted when a navigation session starts.
///
/// Producers: navigation
/// Consumers: renderer (draws the path), UI, analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationStartedEvent {
    /// Unique id of the session.
    pub session_id: String,
    /// Destination store id.
    pub store_id: String,
    /// Destination store display name.
    pub store_name: String,
    /// Where the walk started.
    pub start: Point3<f64>,
    /// Resolved destination.
    pub destination: Point3<f64>,
    /// Sample timestamp at start.
    pub timestamp_ms: u64,
}

/// Event emitted exactly once when a navigation session ends.
///
/// Producers: navigation
/// Consumers: renderer (clears the path), UI, analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEndedEvent {
    pub session_id: String,
    pub store_id: String,
    /// True when the visitor arrived, false when cancelled or superseded.
    pub completed: bool,
    /// Zero on arrival; distance left to the destination otherwise.
    ///
    /// Measured on the ground plane (x/z), like every navigation threshold,
    /// so the marker height above the floor does not count.
    pub remaining_distance: f64,
    pub timestamp_ms: u64,
}

/// Event emitted when the visitor passes an intermediate waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointReachedEvent {
    pub session_id: String,
    /// Session-wide ordinal; strictly increasing within a session.
    pub index: u32,
    /// The waypoint that was reached.
    pub waypoint: Point3<f64>,
    /// Distance left to the destination.
    pub distance: f64,
    pub timestamp_ms: u64,
}

/// Early warning that the destination is near. At most once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseToDestinationEvent {
    pub session_id: String,
    pub store_id: String,
    pub distance: f64,
    pub timestamp_ms: u64,
}

/// Event emitted when the visitor walks into a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneEnteredEvent {
    pub zone_id: String,
    pub timestamp_ms: u64,
}

/// Why a zone reported an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The visitor walked out.
    Left,
    /// The zone was deactivated while occupied.
    Deactivated,
    /// The zone was removed while occupied.
    Removed,
}

/// Event emitted when the visitor leaves a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneExitedEvent {
    pub zone_id: String,
    pub reason: ExitReason,
    /// Time spent inside since the matching enter.
    pub dwell_ms: u64,
    pub timestamp_ms: u64,
}

/// Event emitted when a zone's ad fires (rate-limited by the zone cooldown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdTriggeredEvent {
    pub zone_id: String,
    pub timestamp_ms: u64,
}

/// Event emitted when a displayed ad must be torn down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdDismissedEvent {
    pub zone_id: String,
    pub timestamp_ms: u64,
}

/// Every event published on the guidance bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GuidanceEvent {
    NavigationStarted(NavigationStartedEvent),
    NavigationEnded(NavigationEndedEvent),
    WaypointReached(WaypointReachedEvent),
    CloseToDestination(CloseToDestinationEvent),
    ZoneEntered(ZoneEnteredEvent),
    ZoneExited(ZoneExitedEvent),
    AdTriggered(AdTriggeredEvent),
    AdDismissed(AdDismissedEvent),
}

impl GuidanceEvent {
    /// Topic name used for filtering subscriptions.
    pub fn topic(&self) -> &'static str {
        match self {
            GuidanceEvent::NavigationStarted(_) => event_names::NAVIGATION_STARTED,
            GuidanceEvent::NavigationEnded(_) => event_names::NAVIGATION_ENDED,
            GuidanceEvent::WaypointReached(_) => event_names::WAYPOINT_REACHED,
            GuidanceEvent::CloseToDestination(_) => event_names::CLOSE_TO_DESTINATION,
            GuidanceEvent::ZoneEntered(_) => event_names::ZONE_ENTERED,
            GuidanceEvent::ZoneExited(_) => event_names::ZONE_EXITED,
            GuidanceEvent::AdTriggered(_) => event_names::AD_TRIGGERED,
            GuidanceEvent::AdDismissed(_) => event_names::AD_DISMISSED,
        }
    }

    /// Zone the event refers to, for zone events.
    pub fn zone_id(&self) -> Option<&str> {
        match self {
            GuidanceEvent::ZoneEntered(e) => Some(&e.zone_id),
            GuidanceEvent::ZoneExited(e) => Some(&e.zone_id),
            GuidanceEvent::AdTriggered(e) => Some(&e.zone_id),
            GuidanceEvent::AdDismissed(e) => Some(&e.zone_id),
            _ => None,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            GuidanceEvent::NavigationStarted(e) => e.timestamp_ms,
            GuidanceEvent::NavigationEnded(e) => e.timestamp_ms,
            GuidanceEvent::WaypointReached(e) => e.timestamp_ms,
            GuidanceEvent::CloseToDestination(e) => e.timestamp_ms,
            GuidanceEvent::ZoneEntered(e) => e.timestamp_ms,
            GuidanceEvent::ZoneExited(e) => e.timestamp_ms,
            GuidanceEvent::AdTriggered(e) => e.timestamp_ms,
            GuidanceEvent::AdDismissed(e) => e.timestamp_ms,
        }
    }

    /// JSON form for transports that forward events verbatim.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Event names as constants to prevent typos.
pub mod event_names {
    pub const NAVIGATION_STARTED: &str = "navigation:started";
    pub const NAVIGATION_ENDED: &str = "navigation:ended";
    pub const WAYPOINT_REACHED: &str = "navigation:waypoint_reached";
    pub const CLOSE_TO_DESTINATION: &str = "navigation:close_to_destination";
    pub const ZONE_ENTERED: &str = "geofence:zone_entered";
    pub const ZONE_EXITED: &str = "geofence:zone_exited";
    pub const AD_TRIGGERED: &str = "geofence:ad_triggered";
    pub const AD_DISMISSED: &str = "geofence:ad_dismissed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = GuidanceEvent::ZoneExited(ZoneExitedEvent {
            zone_id: "shoes".into(),
            reason: ExitReason::Left,
            dwell_ms: 1200,
            timestamp_ms: 5000,
        });

        let json = event.to_json();
        assert_eq!(json["type"], "zone_exited");
        assert_eq!(json["payload"]["zoneId"], "shoes");
        assert_eq!(json["payload"]["reason"], "left");
        assert_eq!(json["payload"]["dwellMs"], 1200);
    }

    #[test]
    fn test_navigation_started_roundtrip() {
        let json = r#"{
            "type": "navigation_started",
            "payload": {
                "sessionId": "s1",
                "storeId": "cafe",
                "storeName": "Cafe",
                "start": [0.0, 0.0, 0.0],
                "destination": [0.0, 0.0, 20.0],
                "timestampMs": 42
            }
        }"#;
        let event: GuidanceEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.topic(), event_names::NAVIGATION_STARTED);
        assert_eq!(event.timestamp_ms(), 42);
        assert_eq!(event.zone_id(), None);
    }
}
