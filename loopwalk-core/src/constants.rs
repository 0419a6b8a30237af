//! Centralized tuning and wire constants for LoopWalk trip logic.
//!
//! Keeping these together means the fallback route, the simulated navigation
//! cadence and the persisted storage layout can only change through reviewed
//! code rather than drifting across modules.

use std::time::Duration;

// Distance formatting ------------------------------------------------------
pub const DISTANCE_UNIT_SUFFIX: &str = "mi";

// Directions normalization -------------------------------------------------
pub const START_STEP_LABEL: &str = "Start";
pub const DEFAULT_INSTRUCTION: &str = "Continue";

/// Rows of the built-in route used when a payload carries no steps:
/// `(label, instruction, distance label)`.
pub const FALLBACK_ROUTE_ROWS: [(&str, &str, &str); 4] = [
    ("Current Location", "Starting point", "0 mi"),
    ("First turn", "Head toward your destination", "0.2 mi"),
    ("Continue", "Stay on the current road", "0.3 mi"),
    ("Final approach", "Approaching destination", "0.2 mi"),
];

// Navigation ---------------------------------------------------------------
pub const DEFAULT_TICK_CADENCE: Duration = Duration::from_secs(8);
pub const RECENTER_NOTICE: &str = "Map recentered to your current location";

// Trip session -------------------------------------------------------------
pub const DEFAULT_ORIGIN_LABEL: &str = "Current Location";
pub const DURATION_MIN_MINUTES: u32 = 10;
pub const DURATION_MAX_MINUTES: u32 = 120;
pub const DURATION_STEP_MINUTES: u32 = 5;
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

// Route requests -----------------------------------------------------------
pub const ROUTE_BY_DESTINATION_PATH: &str = "/route";
pub const ROUTE_BY_DURATION_PATH: &str = "/route/by-duration";
pub const HEALTH_PATH: &str = "/health";
pub const DEFAULT_ENRICHMENT_QUERY: &str = "cafe";
pub const UNTHEMED_USER_QUERY: &str = "A pleasant walk";
pub const SERVER_ERROR_FALLBACK_MESSAGE: &str =
    "The route service failed without a response body; check the backend logs.";

// Storage keys -------------------------------------------------------------
pub(crate) const KEY_MODE: &str = "mode";
pub(crate) const KEY_DESTINATION: &str = "destination";
pub(crate) const KEY_DURATION: &str = "duration";
pub(crate) const KEY_GOAL: &str = "goal";
pub(crate) const KEY_GOAL_DETAIL: &str = "goalDetail";
pub(crate) const KEY_PROMPT: &str = "prompt";
pub(crate) const KEY_ORIGIN: &str = "origin";
pub(crate) const KEY_SELECTED_ROUTE: &str = "selectedRoute";

pub(crate) const SESSION_KEYS: [&str; 8] = [
    KEY_MODE,
    KEY_DESTINATION,
    KEY_DURATION,
    KEY_GOAL,
    KEY_GOAL_DETAIL,
    KEY_PROMPT,
    KEY_ORIGIN,
    KEY_SELECTED_ROUTE,
];
