//! Visit analytics for wandur guidance.
//!
//! [`VisitTracker`] listens on the event bus and keeps per-zone visitor
//! counts, dwell times and ad impressions together with navigation outcome
//! counters. A [`AnalyticsReport`] snapshot can be exported as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use wandur_events::{EventBus, GuidanceEvent, LocalEventBus, Subscription};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Failed to write analytics report '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize analytics report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// One completed stay inside a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub zone_id: String,
    /// When the visitor left the zone.
    pub timestamp: DateTime<Utc>,
    pub dwell_secs: f64,
}

/// Aggregates for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub zone_id: String,
    pub visitor_count: u64,
    pub avg_dwell_secs: f64,
    pub ad_impressions: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationStats {
    pub started: u64,
    pub completed: u64,
    pub cancelled: u64,
}

/// Snapshot of everything tracked so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub generated_at: DateTime<Utc>,
    pub zones: Vec<ZoneSummary>,
    pub navigation: NavigationStats,
    pub visits: Vec<VisitRecord>,
}

impl AnalyticsReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty-printed JSON.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| AnalyticsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), zones = self.zones.len(), "exported analytics report");
        Ok(())
    }

    pub fn zone(&self, zone_id: &str) -> Option<&ZoneSummary> {
        self.zones.iter().find(|z| z.zone_id == zone_id)
    }
}

#[derive(Debug, Default)]
struct ZoneTally {
    visitor_count: u64,
    visits_closed: u64,
    total_dwell_ms: u64,
    ad_impressions: u64,
}

#[derive(Debug, Default)]
struct Ledger {
    zones: BTreeMap<String, ZoneTally>,
    visits: Vec<VisitRecord>,
    navigation: NavigationStats,
}

impl Ledger {
    fn record(&mut self, event: &GuidanceEvent) {
        match event {
            GuidanceEvent::ZoneEntered(e) => {
                self.zones.entry(e.zone_id.clone()).or_default().visitor_count += 1;
            }
            GuidanceEvent::ZoneExited(e) => {
                let tally = self.zones.entry(e.zone_id.clone()).or_default();
                tally.visits_closed += 1;
                tally.total_dwell_ms += e.dwell_ms;
                self.visits.push(VisitRecord {
                    zone_id: e.zone_id.clone(),
                    timestamp: to_datetime(e.timestamp_ms),
                    dwell_secs: e.dwell_ms as f64 / 1000.0,
                });
            }
            GuidanceEvent::AdTriggered(e) => {
                self.zones.entry(e.zone_id.clone()).or_default().ad_impressions += 1;
            }
            GuidanceEvent::NavigationStarted(_) => self.navigation.started += 1,
            GuidanceEvent::NavigationEnded(e) if e.completed => self.navigation.completed += 1,
            GuidanceEvent::NavigationEnded(_) => self.navigation.cancelled += 1,
            GuidanceEvent::WaypointReached(_)
            | GuidanceEvent::CloseToDestination(_)
            | GuidanceEvent::AdDismissed(_) => {}
        }
    }

    fn summaries(&self) -> Vec<ZoneSummary> {
        self.zones
            .iter()
            .map(|(zone_id, tally)| ZoneSummary {
                zone_id: zone_id.clone(),
                visitor_count: tally.visitor_count,
                avg_dwell_secs: if tally.visits_closed == 0 {
                    0.0
                } else {
                    tally.total_dwell_ms as f64 / tally.visits_closed as f64 / 1000.0
                },
                ad_impressions: tally.ad_impressions,
            })
            .collect()
    }
}

fn to_datetime(timestamp_ms: u64) -> DateTime<Utc> {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Aggregates guidance events into visit analytics.
///
/// Either attach it to a [`LocalEventBus`] with [`VisitTracker::attach`]
/// (the subscription lives as long as the tracker) or feed it directly,
/// since it is itself an [`EventBus`].
#[derive(Clone, Default)]
pub struct VisitTracker {
    ledger: Arc<Mutex<Ledger>>,
    subscription: Option<Arc<Subscription>>,
}

impl VisitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker subscribed to every event on `bus`.
    pub fn attach(bus: &LocalEventBus) -> Self {
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let sink = Arc::clone(&ledger);
        let subscription = bus.subscribe(move |event| {
            sink.lock().unwrap_or_else(|e| e.into_inner()).record(event);
        });

        Self {
            ledger,
            subscription: Some(Arc::new(subscription)),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn record(&self, event: &GuidanceEvent) {
        self.lock().record(event);
    }

    pub fn navigation(&self) -> NavigationStats {
        self.lock().navigation
    }

    pub fn zone(&self, zone_id: &str) -> Option<ZoneSummary> {
        self.lock()
            .summaries()
            .into_iter()
            .find(|z| z.zone_id == zone_id)
    }

    pub fn visits(&self) -> Vec<VisitRecord> {
        self.lock().visits.clone()
    }

    pub fn report(&self) -> AnalyticsReport {
        let ledger = self.lock();
        AnalyticsReport {
            generated_at: Utc::now(),
            zones: ledger.summaries(),
            navigation: ledger.navigation,
            visits: ledger.visits.clone(),
        }
    }

    /// Forget everything recorded so far. The subscription stays.
    pub fn reset(&self) {
        *self.lock() = Ledger::default();
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventBus for VisitTracker {
    fn publish(&self, event: &GuidanceEvent) {
        self.record(event);
    }
}

impl std::fmt::Debug for VisitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisitTracker")
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wandur_events::{
        AdTriggeredEvent, ExitReason, NavigationEndedEvent, NavigationStartedEvent,
        ZoneEnteredEvent, ZoneExitedEvent,
    };
    use wandur_position::Point3;

    fn entered(zone: &str, t: u64) -> GuidanceEvent {
        GuidanceEvent::ZoneEntered(ZoneEnteredEvent {
            zone_id: zone.into(),
            timestamp_ms: t,
        })
    }

    fn exited(zone: &str, dwell_ms: u64, t: u64) -> GuidanceEvent {
        GuidanceEvent::ZoneExited(ZoneExitedEvent {
            zone_id: zone.into(),
            reason: ExitReason::Left,
            dwell_ms,
            timestamp_ms: t,
        })
    }

    fn ad(zone: &str, t: u64) -> GuidanceEvent {
        GuidanceEvent::AdTriggered(AdTriggeredEvent {
            zone_id: zone.into(),
            timestamp_ms: t,
        })
    }

    fn ended(completed: bool) -> GuidanceEvent {
        GuidanceEvent::NavigationEnded(NavigationEndedEvent {
            session_id: "s".into(),
            store_id: "lumen".into(),
            completed,
            remaining_distance: 0.0,
            timestamp_ms: 0,
        })
    }

    #[test]
    fn test_zone_summary() {
        let tracker = VisitTracker::new();
        for event in [
            entered("kiosk", 0),
            ad("kiosk", 0),
            exited("kiosk", 30_000, 30_000),
            entered("kiosk", 40_000),
            exited("kiosk", 10_000, 50_000),
            entered("kiosk", 60_000),
        ] {
            tracker.record(&event);
        }

        let summary = tracker.zone("kiosk").unwrap();
        assert_eq!(summary.visitor_count, 3);
        assert_eq!(summary.ad_impressions, 1);
        assert!((summary.avg_dwell_secs - 20.0).abs() < 1e-9);

        let visits = tracker.visits();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].timestamp.timestamp_millis(), 30_000);
        assert_eq!(visits[1].dwell_secs, 10.0);
    }

    #[test]
    fn test_navigation_counters() {
        let tracker = VisitTracker::new();
        let started = GuidanceEvent::NavigationStarted(NavigationStartedEvent {
            session_id: "s".into(),
            store_id: "lumen".into(),
            store_name: "Lumen".into(),
            start: Point3::origin(),
            destination: Point3::new(4.0, 0.0, 18.0),
            timestamp_ms: 0,
        });

        tracker.publish(&started);
        tracker.publish(&ended(false));
        tracker.publish(&started);
        tracker.publish(&ended(true));

        assert_eq!(
            tracker.navigation(),
            NavigationStats {
                started: 2,
                completed: 1,
                cancelled: 1
            }
        );
    }

    #[test]
    fn test_attach_follows_bus_and_detaches_on_drop() {
        let bus = LocalEventBus::new();
        let tracker = VisitTracker::attach(&bus);
        assert!(tracker.is_attached());
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&entered("atrium", 0));
        assert_eq!(tracker.zone("atrium").unwrap().visitor_count, 1);

        drop(tracker);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_report_export() {
        let tracker = VisitTracker::new();
        tracker.record(&entered("kiosk", 0));
        tracker.record(&exited("kiosk", 5_000, 5_000));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        tracker.report().export(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["zones"][0]["zone_id"], "kiosk");
        assert_eq!(json["zones"][0]["visitor_count"], 1);
        assert_eq!(json["visits"][0]["dwell_secs"], 5.0);
        assert_eq!(json["navigation"]["started"], 0);
    }

    #[test]
    fn test_reset() {
        let tracker = VisitTracker::new();
        tracker.record(&entered("kiosk", 0));
        tracker.reset();
        assert!(tracker.zone("kiosk").is_none());
        assert!(tracker.report().zones.is_empty());
    }
}
