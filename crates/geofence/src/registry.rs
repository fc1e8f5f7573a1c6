//! Geofence registry: zone bookkeeping and per-sample evaluation.
//!
//! The registry is the single writer of zone occupancy and cooldown state.
//! Each evaluation processes zones in id order and finishes one zone's
//! enter/cooldown/exit logic, including publishing its events, before moving
//! to the next.

use crate::error::{GeofenceError, Result};
use crate::zone::GeofenceZone;
use std::collections::BTreeMap;
use wandur_events::{
    AdDismissedEvent, AdTriggeredEvent, EventBusRef, ExitReason, GuidanceEvent, ZoneEnteredEvent,
    ZoneExitedEvent,
};
use wandur_position::Position;

/// Events produced by the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneEvent {
    Entered(ZoneEnteredEvent),
    Exited(ZoneExitedEvent),
    AdTriggered(AdTriggeredEvent),
    AdDismissed(AdDismissedEvent),
}

impl ZoneEvent {
    pub fn zone_id(&self) -> &str {
        match self {
            ZoneEvent::Entered(e) => &e.zone_id,
            ZoneEvent::Exited(e) => &e.zone_id,
            ZoneEvent::AdTriggered(e) => &e.zone_id,
            ZoneEvent::AdDismissed(e) => &e.zone_id,
        }
    }
}

impl From<ZoneEvent> for GuidanceEvent {
    fn from(event: ZoneEvent) -> Self {
        match event {
            ZoneEvent::Entered(e) => GuidanceEvent::ZoneEntered(e),
            ZoneEvent::Exited(e) => GuidanceEvent::ZoneExited(e),
            ZoneEvent::AdTriggered(e) => GuidanceEvent::AdTriggered(e),
            ZoneEvent::AdDismissed(e) => GuidanceEvent::AdDismissed(e),
        }
    }
}

/// Cross-tick memory for one zone.
#[derive(Debug, Clone, Default)]
struct Occupancy {
    inside: bool,
    entered_at_ms: u64,
    last_trigger_ms: Option<u64>,
    ad_active: bool,
}

#[derive(Debug, Clone)]
struct ZoneRecord {
    zone: GeofenceZone,
    occupancy: Occupancy,
}

/// Registry of geofence zones evaluated against the position stream.
pub struct GeofenceRegistry {
    zones: BTreeMap<String, ZoneRecord>,
    bus: EventBusRef,
    /// Timestamp of the latest evaluated sample.
    clock_ms: u64,
}

impl GeofenceRegistry {
    pub fn new(bus: EventBusRef) -> Self {
        Self {
            zones: BTreeMap::new(),
            bus,
            clock_ms: 0,
        }
    }

    /// Add a zone. Fails if the id is taken or the radius is not positive.
    pub fn add_zone(&mut self, zone: GeofenceZone) -> Result<()> {
        if !(zone.radius.is_finite() && zone.radius > 0.0) {
            return Err(GeofenceError::InvalidRadius {
                zone_id: zone.id,
                radius: zone.radius,
            });
        }
        if self.zones.contains_key(&zone.id) {
            return Err(GeofenceError::DuplicateZone { zone_id: zone.id });
        }

        tracing::debug!(zone_id = %zone.id, radius = zone.radius, active = zone.active, "zone added");
        self.zones.insert(
            zone.id.clone(),
            ZoneRecord {
                zone,
                occupancy: Occupancy::default(),
            },
        );
        Ok(())
    }

    /// Remove a zone, tearing down its ad and reporting an exit if occupied.
    pub fn remove_zone(&mut self, zone_id: &str) -> Result<Vec<ZoneEvent>> {
        let mut record = self
            .zones
            .remove(zone_id)
            .ok_or_else(|| GeofenceError::UnknownZone {
                zone_id: zone_id.to_string(),
            })?;

        let events = self.teardown(&mut record, ExitReason::Removed);
        tracing::debug!(zone_id, "zone removed");
        Ok(events)
    }

    /// Activate or deactivate a zone.
    ///
    /// Deactivating an occupied zone reports an exit and tears down its ad.
    /// Either transition drops occupancy and cooldown bookkeeping.
    pub fn set_active(&mut self, zone_id: &str, active: bool) -> Result<Vec<ZoneEvent>> {
        let clock_ms = self.clock_ms;
        let record = self
            .zones
            .get_mut(zone_id)
            .ok_or_else(|| GeofenceError::UnknownZone {
                zone_id: zone_id.to_string(),
            })?;

        if record.zone.active == active {
            return Ok(Vec::new());
        }

        record.zone.active = active;
        let events = if active {
            record.occupancy = Occupancy::default();
            Vec::new()
        } else {
            teardown_record(record, ExitReason::Deactivated, clock_ms)
        };
        tracing::debug!(zone_id, active, "zone activation changed");

        self.publish(&events);
        Ok(events)
    }

    /// Check a sample against every active zone.
    pub fn evaluate(&mut self, position: &Position) -> Vec<ZoneEvent> {
        let now = position.timestamp_ms.max(self.clock_ms);
        self.clock_ms = now;

        let mut events = Vec::new();
        for record in self.zones.values_mut() {
            if !record.zone.active {
                continue;
            }

            let zone_events = step_zone(record, position, now);
            for event in &zone_events {
                self.bus.publish(&event.clone().into());
            }
            events.extend(zone_events);
        }
        events
    }

    pub fn zone(&self, zone_id: &str) -> Option<&GeofenceZone> {
        self.zones.get(zone_id).map(|r| &r.zone)
    }

    /// Zones in evaluation order.
    pub fn zones(&self) -> impl Iterator<Item = &GeofenceZone> {
        self.zones.values().map(|r| &r.zone)
    }

    pub fn is_inside(&self, zone_id: &str) -> bool {
        self.zones
            .get(zone_id)
            .is_some_and(|r| r.occupancy.inside)
    }

    pub fn ad_active(&self, zone_id: &str) -> bool {
        self.zones
            .get(zone_id)
            .is_some_and(|r| r.occupancy.ad_active)
    }

    pub fn last_trigger_ms(&self, zone_id: &str) -> Option<u64> {
        self.zones
            .get(zone_id)
            .and_then(|r| r.occupancy.last_trigger_ms)
    }

    /// Ids of zones currently occupied.
    pub fn occupied(&self) -> Vec<&str> {
        self.zones
            .values()
            .filter(|r| r.occupancy.inside)
            .map(|r| r.zone.id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    fn teardown(&self, record: &mut ZoneRecord, reason: ExitReason) -> Vec<ZoneEvent> {
        let events = teardown_record(record, reason, self.clock_ms);
        self.publish(&events);
        events
    }

    fn publish(&self, events: &[ZoneEvent]) {
        for event in events {
            self.bus.publish(&event.clone().into());
        }
    }
}

impl std::fmt::Debug for GeofenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeofenceRegistry")
            .field("zones", &self.zones.len())
            .field("clock_ms", &self.clock_ms)
            .finish_non_exhaustive()
    }
}

/// Edge-detect one zone against a sample.
fn step_zone(record: &mut ZoneRecord, position: &Position, now: u64) -> Vec<ZoneEvent> {
    let zone = &record.zone;
    let occupancy = &mut record.occupancy;
    let inside = zone.contains(&position.point);
    let mut events = Vec::new();

    match (occupancy.inside, inside) {
        (false, true) => {
            occupancy.inside = true;
            occupancy.entered_at_ms = now;
            tracing::debug!(zone_id = %zone.id, "zone entered");
            events.push(ZoneEvent::Entered(ZoneEnteredEvent {
                zone_id: zone.id.clone(),
                timestamp_ms: now,
            }));

            let cooled_down = occupancy
                .last_trigger_ms
                .is_none_or(|last| now.saturating_sub(last) > zone.cooldown_ms);
            if cooled_down {
                occupancy.last_trigger_ms = Some(now);
                occupancy.ad_active = true;
                tracing::info!(zone_id = %zone.id, "ad triggered");
                events.push(ZoneEvent::AdTriggered(AdTriggeredEvent {
                    zone_id: zone.id.clone(),
                    timestamp_ms: now,
                }));
            } else {
                tracing::debug!(zone_id = %zone.id, "ad suppressed by cooldown");
            }
        }
        (true, false) => {
            occupancy.inside = false;
            tracing::debug!(zone_id = %zone.id, "zone exited");
            events.push(ZoneEvent::Exited(ZoneExitedEvent {
                zone_id: zone.id.clone(),
                reason: ExitReason::Left,
                dwell_ms: now.saturating_sub(occupancy.entered_at_ms),
                timestamp_ms: now,
            }));
            if occupancy.ad_active {
                occupancy.ad_active = false;
                events.push(ZoneEvent::AdDismissed(AdDismissedEvent {
                    zone_id: zone.id.clone(),
                    timestamp_ms: now,
                }));
            }
        }
        _ => {}
    }

    events
}

/// Close out a zone that is being deactivated or removed.
fn teardown_record(record: &mut ZoneRecord, reason: ExitReason, now: u64) -> Vec<ZoneEvent> {
    let occupancy = std::mem::take(&mut record.occupancy);
    let zone_id = &record.zone.id;
    let mut events = Vec::new();

    if occupancy.inside {
        events.push(ZoneEvent::Exited(ZoneExitedEvent {
            zone_id: zone_id.clone(),
            reason,
            dwell_ms: now.saturating_sub(occupancy.entered_at_ms),
            timestamp_ms: now,
        }));
    }
    if occupancy.ad_active {
        tracing::debug!(zone_id = %zone_id, ?reason, "tearing down active ad");
        events.push(ZoneEvent::AdDismissed(AdDismissedEvent {
            zone_id: zone_id.clone(),
            timestamp_ms: now,
        }));
    }
    events
}
