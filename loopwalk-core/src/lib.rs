//! LoopWalk Trip Engine
//!
//! Platform-agnostic trip planning logic for the LoopWalk walking guide.
//! This crate covers the planning session, directions normalization, simulated
//! navigation progress and screen flow without UI or transport dependencies.

pub mod constants;
pub mod directions;
pub mod flow;
pub mod navigation;
pub mod planner;
pub mod request;
pub mod route;
pub mod session;
pub mod storage;
pub mod theme;

// Re-export commonly used types
pub use directions::{normalize, normalize_response, strip_html};
pub use flow::{Screen, ScreenFlowController, Transition};
pub use navigation::{NavigationExit, NavigationProgressTracker, TickEvent, TickLease};
pub use planner::{PlannerError, PlannerResult, TripPlanner};
pub use request::{
    DestinationRouteRequest, DurationRouteRequest, RouteFetchError, RouteFetcher, RouteRequest,
    RouteResponse, extract_error_message,
};
pub use route::{
    NormalizedRoute, RouteStep, StepKind, format_distance, parse_distance_value,
    sum_step_distances,
};
pub use session::{
    RestoredSession, SessionCodecError, TravelGoal, TravelGoalMode, TripSession,
    duration_choices, is_duration_choice,
};
pub use storage::{MemoryStorage, SessionStorage};
pub use theme::{THEME_PRESETS, Theme, ThemeCategory, ThemePreset, find_preset, presets_for};
