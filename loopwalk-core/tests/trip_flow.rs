use std::cell::Cell;
use std::time::Duration;

use loopwalk_core::{
    MemoryStorage, NavigationExit, NavigationProgressTracker, NormalizedRoute, PlannerError,
    RouteStep, Screen, ScreenFlowController, SessionStorage, StepKind, ThemeCategory, TickEvent,
    Transition, TravelGoalMode, TripPlanner, TripSession,
};

fn five_step_route() -> NormalizedRoute {
    let steps = (0..5)
        .map(|index| {
            let kind = if index == 0 {
                StepKind::Start
            } else {
                StepKind::Waypoint
            };
            RouteStep::new(format!("Step {}", index + 1), "Walk", "0.25 mi", kind)
        })
        .collect();
    NormalizedRoute::from_steps(steps, None).unwrap()
}

#[test]
fn goal_modes_stay_mutually_exclusive_in_either_order() {
    let mut session = TripSession::new();
    session.set_goal_by_destination("X");
    session.set_goal_by_duration(30);
    assert_eq!(session.mode(), Some(TravelGoalMode::ByDuration));
    assert_eq!(session.duration_minutes(), Some(30));
    assert_eq!(session.destination_name(), None);

    session.set_goal_by_destination("X");
    assert_eq!(session.mode(), Some(TravelGoalMode::ByDestination));
    assert_eq!(session.duration_minutes(), None);
}

#[test]
fn five_step_route_reaches_one_hundred_percent_and_clamps() {
    let mut tracker = NavigationProgressTracker::new();
    tracker.start(five_step_route());
    for _ in 0..4 {
        tracker.advance();
    }
    assert_eq!(tracker.current_index(), Some(4));
    assert!((tracker.percent_complete() - 100.0).abs() < f64::EPSILON);
    tracker.advance();
    assert_eq!(tracker.current_index(), Some(4));
    assert_eq!(tracker.completed_count(), 4);
    assert_eq!(tracker.remaining_distance_label(), "0.0 mi");
}

#[test]
fn empty_session_cannot_reach_route_preview() {
    let mut flow = ScreenFlowController::new();
    let transition = flow.request(Screen::RoutePreview, &TripSession::new());
    assert_eq!(transition.landed(), Screen::Start);
    assert!(transition.is_redirect());
}

#[test]
fn restart_halts_pending_ticks() {
    let storage = MemoryStorage::new();
    let mut planner = TripPlanner::new(storage.clone()).with_cadence(Duration::from_secs(8));
    planner.set_goal_by_destination("Chicago Riverwalk").unwrap();
    planner.set_theme(ThemeCategory::MovieLocation, "").unwrap();
    planner.attach_route(five_step_route()).unwrap();
    planner.request(Screen::ActiveNavigation).unwrap();

    let lease = planner.lease().unwrap();
    assert_eq!(planner.tick(TickEvent::new(lease, Duration::from_secs(8))), 1);

    assert_eq!(planner.restart().unwrap().landed(), Screen::Intro);
    assert_eq!(planner.tick(TickEvent::new(lease, Duration::from_secs(80))), 0);
    assert!(!planner.tracker().is_active());
    assert_eq!(planner.session(), &TripSession::default());
    assert!(storage.is_empty());
}

#[test]
fn leaving_navigation_by_back_stops_the_tracker() {
    let mut planner = TripPlanner::new(MemoryStorage::new()).with_cadence(Duration::ZERO);
    planner.set_goal_by_duration(60).unwrap();
    planner.select_preset("cozy-cafes").unwrap();
    planner.request(Screen::ActiveNavigation).unwrap();
    let lease = planner.lease().unwrap();

    let transition = planner.back().unwrap();
    assert_eq!(
        transition,
        Transition::Entered {
            from: Screen::ActiveNavigation,
            to: Screen::RoutePreview
        }
    );
    assert_eq!(planner.tick(TickEvent::new(lease, Duration::ZERO)), 0);
    assert!(planner.lease().is_none());
}

#[test]
fn tracker_exits_signal_their_destination() {
    let mut tracker = NavigationProgressTracker::new();
    tracker.start(NormalizedRoute::fallback());
    assert_eq!(tracker.end(), NavigationExit::ReturnToRoutePreview);
    tracker.start(NormalizedRoute::fallback());
    assert_eq!(tracker.restart(), NavigationExit::RestartFromIntro);
}

#[test]
fn reload_on_guarded_screen_with_missing_goal_redirects() {
    let storage = MemoryStorage::new();
    storage.set_item("goal", "historic").unwrap();
    storage.set_item("goalDetail", "Field Building").unwrap();

    let planner = TripPlanner::resume_at(storage.clone(), Screen::RoutePreview).unwrap();
    assert_eq!(planner.screen(), Screen::Start);
    assert_eq!(planner.session(), &TripSession::default());
    assert!(storage.is_empty());
}

#[test]
fn reload_on_navigation_resumes_the_saved_route() {
    let storage = MemoryStorage::new();
    let mut planner = TripPlanner::new(storage.clone());
    planner.set_goal_by_duration(25).unwrap();
    planner.set_theme(ThemeCategory::FoodPreference, "Cozy Cafes").unwrap();
    planner.attach_route(five_step_route()).unwrap();
    drop(planner);

    let planner = TripPlanner::resume_at(storage, Screen::ActiveNavigation).unwrap();
    assert_eq!(planner.screen(), Screen::ActiveNavigation);
    assert_eq!(planner.tracker().route(), Some(&five_step_route()));
    assert_eq!(planner.tracker().current_index(), Some(0));
}

#[derive(Debug, thiserror::Error)]
#[error("storage offline")]
struct Offline;

/// Memory-backed store whose writes and removals can be switched off.
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    reject_sets: Cell<bool>,
    reject_removes: Cell<bool>,
}

impl SessionStorage for FlakyStorage {
    type Error = Offline;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.inner.get_item(key).unwrap_or_default())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        if self.reject_sets.get() {
            return Err(Offline);
        }
        self.inner.set_item(key, value).map_err(|never| match never {})
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        if self.reject_removes.get() {
            return Err(Offline);
        }
        self.inner.remove_item(key).map_err(|never| match never {})
    }

    fn clear(&self) -> Result<(), Self::Error> {
        self.inner.clear().map_err(|never| match never {})
    }
}

#[test]
fn storage_failures_surface_as_planner_errors() {
    let mut planner = TripPlanner::new(FlakyStorage::default());
    planner.storage().reject_sets.set(true);
    let err = planner.set_goal_by_duration(30).unwrap_err();
    assert!(matches!(err, PlannerError::Storage(Offline)));
    assert_eq!(err.to_string(), "session storage failed: storage offline");
    assert_eq!(planner.session(), &TripSession::default());
    assert!(planner.storage().inner.is_empty());
}

#[test]
fn failed_goal_switch_keeps_session_and_storage_in_one_mode() {
    let mut planner = TripPlanner::new(FlakyStorage::default());
    planner.set_goal_by_destination("Navy Pier").unwrap();

    planner.storage().reject_removes.set(true);
    assert!(planner.set_goal_by_duration(30).is_err());

    assert_eq!(planner.session().destination_name(), Some("Navy Pier"));
    assert_eq!(planner.session().duration_minutes(), None);
    let stored = planner.storage().inner.snapshot();
    assert_eq!(stored.get("mode").map(String::as_str), Some("destination"));
    assert_eq!(stored.get("destination").map(String::as_str), Some("Navy Pier"));

    planner.storage().reject_removes.set(false);
    let resumed = TripPlanner::resume(FlakyStorage {
        inner: planner.storage().inner.clone(),
        ..FlakyStorage::default()
    })
    .unwrap();
    assert_eq!(resumed.session(), planner.session());

    planner.set_goal_by_duration(30).unwrap();
    let stored = planner.storage().inner.snapshot();
    assert_eq!(stored.get("mode").map(String::as_str), Some("duration"));
    assert!(!stored.contains_key("destination"));
}

#[test]
fn failed_write_midway_rolls_back_to_previous_entries() {
    let mut planner = TripPlanner::new(FlakyStorage::default());
    planner.set_goal_by_duration(45).unwrap();
    planner.set_theme(ThemeCategory::Historic, "Rookery").unwrap();

    planner.storage().reject_sets.set(true);
    assert!(planner.set_goal_by_destination("Navy Pier").is_err());
    planner.storage().reject_sets.set(false);

    assert_eq!(planner.session().duration_minutes(), Some(45));
    let resumed = TripPlanner::resume(FlakyStorage {
        inner: planner.storage().inner.clone(),
        ..FlakyStorage::default()
    })
    .unwrap();
    assert_eq!(resumed.session(), planner.session());
}

#[test]
fn resumed_redirect_keeps_storage_error_chain() {
    let storage = FlakyStorage::default();
    storage.inner.set_item("mode", "duration").unwrap();
    storage.inner.set_item("duration", "20").unwrap();
    storage.reject_removes.set(true);

    let err = match TripPlanner::resume_at(storage, Screen::RoutePreview) {
        Ok(_) => panic!("redirect should fail to clear storage"),
        Err(err) => err,
    };
    let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
    assert_eq!(chain[0], "applying resumed screen");
    assert_eq!(chain[1], "session storage failed: storage offline");
    assert_eq!(chain.last().map(String::as_str), Some("storage offline"));
}
