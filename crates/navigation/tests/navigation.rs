//! Integration tests for the navigation state machine.
//!
//! Uses an in-memory event bus and scripted positions for deterministic runs.

use std::sync::Arc;
use wandur_events::{event_names, GuidanceEvent, InMemoryEventBus};
use wandur_navigation::{
    Destination, NavigationConfig, NavigationError, NavigationState, Navigator, StaticResolver,
};
use wandur_planner::{NoSurface, PathPlanner, PlannerConfig, Surface, SurfaceProber, SurfaceSet};
use wandur_position::{
    Point3, Position, PositionError, PositionSource, ScriptedPositionSource, SourceState,
};

fn resolver() -> Arc<StaticResolver> {
    Arc::new(
        StaticResolver::new()
            .with(Destination::new("shoes", "Shoe Gallery", Point3::new(0.0, 0.0, 20.0)))
            .with(Destination::new("cafe", "Corner Cafe", Point3::new(10.0, 0.0, 0.0))),
    )
}

fn navigator_with(
    config: NavigationConfig,
    prober: Arc<dyn SurfaceProber>,
) -> (Navigator, Arc<InMemoryEventBus>) {
    let bus = Arc::new(InMemoryEventBus::new());
    let planner = PathPlanner::new(PlannerConfig::default(), prober).unwrap();
    let navigator = Navigator::new(config, planner, resolver(), bus.clone()).unwrap();
    (navigator, bus)
}

fn navigator(config: NavigationConfig) -> (Navigator, Arc<InMemoryEventBus>) {
    navigator_with(config, Arc::new(NoSurface))
}

/// Never replans on the interval, so waypoints stay put during a test.
fn frozen_config() -> NavigationConfig {
    NavigationConfig {
        replan_interval_ms: u64::MAX,
        ..Default::default()
    }
}

fn at_z(z: f64, t: u64) -> Position {
    Position::new(0.0, 0.0, z, t)
}

struct UnreadySource;

impl PositionSource for UnreadySource {
    fn state(&self) -> SourceState {
        SourceState::NotReady
    }

    fn sample(&self) -> wandur_position::Result<Option<Position>> {
        Err(PositionError::NotReady)
    }
}

// =============================================================================
// Starting
// =============================================================================

mod starting {
    use super::*;

    #[test]
    fn test_start_publishes_started_and_plans() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        let source = ScriptedPositionSource::new(vec![at_z(0.0, 0)]);

        let id = nav.start("shoes", &source).unwrap();

        assert_eq!(nav.state(), NavigationState::Navigating);
        let session = nav.session().unwrap();
        assert_eq!(session.id(), id);
        assert_eq!(session.path().waypoint_count(), 9);
        assert_eq!(session.path().start(), Point3::origin());

        let events = bus.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            GuidanceEvent::NavigationStarted(e) => {
                assert_eq!(e.session_id, id);
                assert_eq!(e.store_id, "shoes");
                assert_eq!(e.store_name, "Shoe Gallery");
                assert_eq!(e.destination, Point3::new(0.0, 0.0, 20.0));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_destination_changes_nothing() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        let active = nav.session().unwrap().id().to_string();
        bus.clear();

        let err = nav.start_from("nowhere", at_z(1.0, 10)).unwrap_err();

        assert_eq!(
            err,
            NavigationError::DestinationNotFound {
                store_id: "nowhere".into()
            }
        );
        assert_eq!(nav.session().unwrap().id(), active);
        assert_eq!(nav.state(), NavigationState::Navigating);
        assert!(bus.is_empty(), "failed start must not cancel the active session");
    }

    #[test]
    fn test_unready_source_rejected() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        let err = nav.start("shoes", &UnreadySource).unwrap_err();

        assert_eq!(err, NavigationError::PositionSourceNotReady);
        assert_eq!(nav.state(), NavigationState::Idle);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_source_without_fix_rejected() {
        let (mut nav, _bus) = navigator(NavigationConfig::default());
        let source = ScriptedPositionSource::new(Vec::new());

        assert_eq!(
            nav.start("shoes", &source).unwrap_err(),
            NavigationError::PositionUnknown
        );
        assert!(!nav.is_navigating());
    }

    #[test]
    fn test_new_start_supersedes_active_session() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        let first = nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        let second = nav.start_from("cafe", at_z(5.0, 100)).unwrap();

        assert_ne!(first, second);
        assert_eq!(
            bus.topics(),
            vec![
                event_names::NAVIGATION_STARTED,
                event_names::NAVIGATION_ENDED,
                event_names::NAVIGATION_STARTED,
            ]
        );
        match &bus.events()[1] {
            GuidanceEvent::NavigationEnded(e) => {
                assert_eq!(e.session_id, first);
                assert!(!e.completed);
                assert!((e.remaining_distance - 15.0).abs() < 1e-9);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(nav.session().unwrap().destination().store_id, "cafe");
    }
}

// =============================================================================
// Progress
// =============================================================================

mod progress {
    use super::*;

    #[test]
    fn test_close_to_destination_fires_once() {
        let (mut nav, bus) = navigator(frozen_config());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        // In, out, in again
        nav.tick(&at_z(16.0, 100));
        nav.tick(&at_z(14.0, 200));
        nav.tick(&at_z(16.5, 300));
        nav.tick(&at_z(17.0, 400));

        assert_eq!(bus.events_for(event_names::CLOSE_TO_DESTINATION).len(), 1);
        assert!(nav.session().unwrap().close_notified());
    }

    #[test]
    fn test_waypoints_reported_in_order_once() {
        let (mut nav, bus) = navigator(frozen_config());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        for step in 0..=16 {
            nav.tick(&at_z(step as f64, step * 100));
        }
        // Walk back over the same waypoints
        for step in (0..=16).rev() {
            nav.tick(&at_z(step as f64, 2000 + (16 - step) * 100));
        }

        let indices: Vec<u32> = bus
            .events_for(event_names::WAYPOINT_REACHED)
            .into_iter()
            .map(|e| match e {
                GuidanceEvent::WaypointReached(w) => w.index,
                _ => unreachable!(),
            })
            .collect();

        assert!(!indices.is_empty());
        assert!(
            indices.windows(2).all(|w| w[1] > w[0]),
            "indices not increasing: {:?}",
            indices
        );
        assert!(indices.len() <= 9);
    }

    #[test]
    fn test_only_one_waypoint_per_tick() {
        let config = NavigationConfig {
            waypoint_radius: 4.5,
            ..frozen_config()
        };
        let (mut nav, bus) = navigator(config);
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        // Waypoints at ~5.45 and ~7.27 are both in range
        let events = nav.tick(&at_z(5.0, 100));

        let reached = events
            .iter()
            .filter(|e| e.topic() == event_names::WAYPOINT_REACHED)
            .count();
        assert_eq!(reached, 1);
        assert_eq!(bus.events_for(event_names::WAYPOINT_REACHED).len(), 1);
    }

    #[test]
    fn test_waypoints_under_start_are_not_reported() {
        let config = NavigationConfig {
            waypoint_radius: 4.5,
            ..frozen_config()
        };
        let (mut nav, bus) = navigator(config);
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        nav.tick(&at_z(0.0, 100));
        nav.tick(&at_z(0.5, 200));

        assert!(bus.events_for(event_names::WAYPOINT_REACHED).is_empty());
    }

    #[test]
    fn test_standing_still_through_replans_reports_nothing() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        for tick in 1..=100 {
            nav.tick(&at_z(0.0, tick * 100));
        }

        assert_eq!(nav.session().unwrap().path().planned_at_ms(), 10_000);
        assert!(bus.events_for(event_names::WAYPOINT_REACHED).is_empty());
    }

    #[test]
    fn test_walking_through_replans_reports_forward_progress_only() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        // 0.25 m every 100 ms, replanning every second, stopping short of arrival
        for tick in 1..=70 {
            nav.tick(&at_z(tick as f64 * 0.25, tick * 100));
        }

        let distances: Vec<f64> = bus
            .events_for(event_names::WAYPOINT_REACHED)
            .into_iter()
            .map(|e| match e {
                GuidanceEvent::WaypointReached(w) => w.distance,
                _ => unreachable!(),
            })
            .collect();

        assert!(!distances.is_empty());
        assert!(
            distances.windows(2).all(|w| w[1] < w[0]),
            "waypoint reported without progress: {:?}",
            distances
        );
    }

    #[test]
    fn test_interval_replan_starts_from_current_position() {
        let config = NavigationConfig {
            replan_interval_ms: 1000,
            ..Default::default()
        };
        let (mut nav, _bus) = navigator(config);
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        nav.tick(&Position::new(0.5, 0.0, 3.0, 500));
        assert_eq!(nav.session().unwrap().path().start(), Point3::origin());

        nav.tick(&Position::new(0.5, 0.0, 4.0, 1000));
        let path = nav.session().unwrap().path();
        assert_eq!(path.start(), Point3::new(0.5, 0.0, 4.0));
        assert_eq!(path.destination(), Point3::new(0.0, 0.0, 20.0));
        assert_eq!(path.planned_at_ms(), 1000);
    }

    #[test]
    fn test_new_surfaces_trigger_replan() {
        let surfaces = Arc::new(SurfaceSet::new());
        let (mut nav, _bus) = navigator_with(frozen_config(), surfaces.clone());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        nav.tick(&at_z(1.0, 100));
        assert_eq!(nav.session().unwrap().path().planned_at_ms(), 0);

        surfaces.add(Surface {
            min: [-50.0, -50.0],
            max: [50.0, 50.0],
            height: -0.2,
        });
        nav.tick(&at_z(2.0, 200));

        let path = nav.session().unwrap().path();
        assert_eq!(path.planned_at_ms(), 200);
        assert!(path.waypoints().iter().all(|w| (w.y - (-0.1)).abs() < 1e-9));
    }

    #[test]
    fn test_explicit_surface_notification_replans() {
        let (mut nav, _bus) = navigator(frozen_config());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        nav.notify_surfaces_changed();
        nav.tick(&at_z(3.0, 300));

        assert_eq!(nav.session().unwrap().path().planned_at_ms(), 300);
    }
}

// =============================================================================
// Ending
// =============================================================================

mod ending {
    use super::*;

    #[test]
    fn test_arrival_happens_exactly_once() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        let events = nav.tick(&at_z(18.6, 100));
        assert_eq!(nav.state(), NavigationState::Arrived);
        assert!(!nav.is_navigating());

        match events.last() {
            Some(GuidanceEvent::NavigationEnded(e)) => {
                assert!(e.completed);
                assert_eq!(e.remaining_distance, 0.0);
            }
            other => panic!("expected arrival, got {:?}", other),
        }

        let after = nav.tick(&at_z(19.5, 200));
        assert!(after.is_empty());
        assert_eq!(bus.events_for(event_names::NAVIGATION_ENDED).len(), 1);
    }

    #[test]
    fn test_marker_height_does_not_delay_arrival() {
        let (mut nav, _bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        // Device held at eye level, 1.4m short of the store on the ground plane
        nav.tick(&Position::new(0.0, 1.6, 18.6, 100));
        assert_eq!(nav.state(), NavigationState::Arrived);
    }

    #[test]
    fn test_cancel_reports_remaining_distance() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        nav.tick(&at_z(2.0, 100));

        let ended = nav.stop_at(at_z(5.0, 200)).unwrap();

        assert!(!ended.completed);
        assert!((ended.remaining_distance - 15.0).abs() < 1e-9);
        assert_eq!(nav.state(), NavigationState::Cancelled);
        assert_eq!(bus.events_for(event_names::NAVIGATION_ENDED).len(), 1);
    }

    #[test]
    fn test_stop_uses_last_known_position() {
        let (mut nav, _bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        nav.tick(&at_z(8.0, 100));

        let ended = nav.stop().unwrap();
        assert!((ended.remaining_distance - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_remaining_distance_ignores_height() {
        let (mut nav, _bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();

        // One floor up, 12 m short on the ground plane
        let ended = nav.stop_at(Position::new(0.0, 4.0, 8.0, 100)).unwrap();
        assert!((ended.remaining_distance - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_cancelled_session_is_silent() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        nav.stop();
        let published = bus.len();

        assert!(nav.tick(&at_z(19.9, 500)).is_empty());
        assert!(nav.stop().is_none());
        assert_eq!(bus.len(), published);
    }

    #[test]
    fn test_restart_after_arrival_rearms_flags() {
        let (mut nav, bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        nav.tick(&at_z(19.0, 100));
        assert_eq!(nav.state(), NavigationState::Arrived);

        nav.start_from("shoes", at_z(0.0, 200)).unwrap();
        nav.tick(&at_z(16.0, 300));

        assert_eq!(bus.events_for(event_names::CLOSE_TO_DESTINATION).len(), 2);
    }
}

// =============================================================================
// Destination updates
// =============================================================================

mod destination_updates {
    use super::*;

    #[test]
    fn test_update_destination_replans() {
        let (mut nav, _bus) = navigator(NavigationConfig::default());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        nav.tick(&at_z(2.0, 100));

        nav.update_destination("cafe").unwrap();

        let session = nav.session().unwrap();
        assert_eq!(session.destination().store_id, "cafe");
        assert_eq!(session.path().start(), Point3::new(0.0, 0.0, 2.0));
        assert_eq!(session.path().destination(), Point3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_update_keeps_close_flag_by_default() {
        let (mut nav, bus) = navigator(frozen_config());
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        nav.tick(&at_z(16.0, 100));
        nav.update_destination("cafe").unwrap();
        nav.tick(&Position::new(7.0, 0.0, 0.0, 200));

        assert_eq!(bus.events_for(event_names::CLOSE_TO_DESTINATION).len(), 1);
    }

    #[test]
    fn test_update_rearms_close_flag_when_configured() {
        let config = NavigationConfig {
            rearm_close_on_update: true,
            ..frozen_config()
        };
        let (mut nav, bus) = navigator(config);
        nav.start_from("shoes", at_z(0.0, 0)).unwrap();
        nav.tick(&at_z(16.0, 100));
        nav.update_destination("cafe").unwrap();
        nav.tick(&Position::new(7.0, 0.0, 0.0, 200));

        assert_eq!(bus.events_for(event_names::CLOSE_TO_DESTINATION).len(), 2);
    }

    #[test]
    fn test_update_requires_session() {
        let (mut nav, _bus) = navigator(NavigationConfig::default());
        assert_eq!(
            nav.update_destination("cafe").unwrap_err(),
            NavigationError::NotNavigating
        );
    }
}
