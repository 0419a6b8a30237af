//! Trip session: the choices accumulated across the planning screens.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    DEFAULT_ORIGIN_LABEL, DURATION_MAX_MINUTES, DURATION_MIN_MINUTES, DURATION_STEP_MINUTES,
    KEY_DESTINATION, KEY_DURATION, KEY_GOAL, KEY_GOAL_DETAIL, KEY_MODE, KEY_ORIGIN, KEY_PROMPT,
    KEY_SELECTED_ROUTE,
};
use crate::route::NormalizedRoute;
use crate::theme::{Theme, ThemeCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelGoalMode {
    #[serde(rename = "destination")]
    ByDestination,
    #[serde(rename = "duration")]
    ByDuration,
}

impl TravelGoalMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ByDestination => "destination",
            Self::ByDuration => "duration",
        }
    }
}

impl fmt::Display for TravelGoalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelGoalMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "destination" => Ok(Self::ByDestination),
            "duration" => Ok(Self::ByDuration),
            _ => Err(()),
        }
    }
}

/// Where the walk should end, or how long it should take. Holding exactly
/// one of the two is what keeps destination and duration mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelGoal {
    Destination(String),
    Duration(u32),
}

impl TravelGoal {
    #[must_use]
    pub const fn mode(&self) -> TravelGoalMode {
        match self {
            Self::Destination(_) => TravelGoalMode::ByDestination,
            Self::Duration(_) => TravelGoalMode::ByDuration,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionCodecError {
    #[error("failed to encode the active route: {0}")]
    Route(#[from] serde_json::Error),
}

/// Outcome of rebuilding a session from stored entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredSession {
    pub session: TripSession,
    /// Keys whose stored values could not be used and should be dropped.
    pub discarded: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TripSession {
    goal: Option<TravelGoal>,
    theme: Theme,
    prompt: Option<String>,
    origin: Option<String>,
    active_route: Option<NormalizedRoute>,
}

impl TripSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_goal_by_destination(&mut self, destination_name: impl Into<String>) {
        self.goal = Some(TravelGoal::Destination(destination_name.into()));
    }

    /// Store a time budget. Range checks belong to the picker, not here.
    pub fn set_goal_by_duration(&mut self, minutes: u32) {
        self.goal = Some(TravelGoal::Duration(minutes));
    }

    /// Replace the single active theme.
    pub fn set_theme(&mut self, category: ThemeCategory, detail_label: impl Into<String>) {
        self.theme = Theme::new(category, detail_label);
    }

    /// Remember the latest free-text request typed by the walker.
    pub fn set_free_text_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into().trim().to_string();
        self.prompt = (!prompt.is_empty()).then_some(prompt);
    }

    pub fn set_origin(&mut self, origin_label: impl Into<String>) {
        let origin = origin_label.into().trim().to_string();
        self.origin = (!origin.is_empty()).then_some(origin);
    }

    /// Replace the active route wholesale.
    pub fn attach_route(&mut self, route: NormalizedRoute) {
        self.active_route = Some(route);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Turn a pending free-text prompt into the active theme when no preset
    /// theme was chosen. Returns whether the theme changed.
    pub fn commit_prompt_as_theme(&mut self) -> bool {
        match (&self.prompt, self.theme.is_none()) {
            (Some(prompt), true) => {
                self.theme = Theme::new(ThemeCategory::CustomText, prompt.clone());
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_ready_for_goal_selection(&self) -> bool {
        match &self.goal {
            Some(TravelGoal::Destination(name)) => !name.trim().is_empty(),
            Some(TravelGoal::Duration(_)) => true,
            None => false,
        }
    }

    #[must_use]
    pub fn is_ready_for_route_preview(&self) -> bool {
        !self.theme.is_none() || self.prompt.is_some()
    }

    #[must_use]
    pub const fn goal(&self) -> Option<&TravelGoal> {
        self.goal.as_ref()
    }

    #[must_use]
    pub fn mode(&self) -> Option<TravelGoalMode> {
        self.goal.as_ref().map(TravelGoal::mode)
    }

    #[must_use]
    pub fn destination_name(&self) -> Option<&str> {
        match &self.goal {
            Some(TravelGoal::Destination(name)) => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub const fn duration_minutes(&self) -> Option<u32> {
        match self.goal {
            Some(TravelGoal::Duration(minutes)) => Some(minutes),
            _ => None,
        }
    }

    #[must_use]
    pub const fn theme(&self) -> &Theme {
        &self.theme
    }

    #[must_use]
    pub const fn theme_category(&self) -> ThemeCategory {
        self.theme.category()
    }

    #[must_use]
    pub fn theme_detail(&self) -> &str {
        self.theme.detail()
    }

    #[must_use]
    pub fn free_text_prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Explicit origin, if one was given.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Origin shown to the walker, defaulting to the current location.
    #[must_use]
    pub fn origin_label(&self) -> &str {
        self.origin.as_deref().unwrap_or(DEFAULT_ORIGIN_LABEL)
    }

    #[must_use]
    pub const fn active_route(&self) -> Option<&NormalizedRoute> {
        self.active_route.as_ref()
    }

    /// Flatten the session into storage entries. Keys not returned are absent
    /// and should be removed from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the active route cannot be serialized.
    pub fn to_entries(&self) -> Result<BTreeMap<&'static str, String>, SessionCodecError> {
        let mut entries = BTreeMap::new();
        if let Some(goal) = &self.goal {
            entries.insert(KEY_MODE, goal.mode().as_str().to_string());
            match goal {
                TravelGoal::Destination(name) => {
                    entries.insert(KEY_DESTINATION, name.clone());
                }
                TravelGoal::Duration(minutes) => {
                    entries.insert(KEY_DURATION, minutes.to_string());
                }
            }
        }
        if !self.theme.is_none() {
            entries.insert(KEY_GOAL, self.theme.category().as_str().to_string());
            entries.insert(KEY_GOAL_DETAIL, self.theme.detail().to_string());
        }
        if let Some(prompt) = &self.prompt {
            entries.insert(KEY_PROMPT, prompt.clone());
        }
        if let Some(origin) = &self.origin {
            entries.insert(KEY_ORIGIN, origin.clone());
        }
        if let Some(route) = &self.active_route {
            entries.insert(KEY_SELECTED_ROUTE, serde_json::to_string(route)?);
        }
        Ok(entries)
    }

    /// Rebuild a session from stored entries.
    ///
    /// Never fails: entries that cannot be interpreted are reported in
    /// [`RestoredSession::discarded`] and treated as absent.
    #[must_use]
    pub fn from_entries(entries: &BTreeMap<&'static str, String>) -> RestoredSession {
        let mut discarded = Vec::new();
        let mut session = Self::default();

        match entries.get(KEY_MODE).map(|mode| mode.parse::<TravelGoalMode>()) {
            Some(Ok(TravelGoalMode::ByDestination)) => match entries.get(KEY_DESTINATION) {
                Some(name) => session.set_goal_by_destination(name.clone()),
                None => discarded.push(KEY_MODE),
            },
            Some(Ok(TravelGoalMode::ByDuration)) => {
                match entries.get(KEY_DURATION).map(|raw| raw.trim().parse::<u32>()) {
                    Some(Ok(minutes)) => session.set_goal_by_duration(minutes),
                    Some(Err(_)) => discarded.extend([KEY_MODE, KEY_DURATION]),
                    None => discarded.push(KEY_MODE),
                }
            }
            Some(Err(())) => discarded.push(KEY_MODE),
            None => {}
        }

        if let Some(raw) = entries.get(KEY_GOAL) {
            match raw.parse::<ThemeCategory>() {
                Ok(category) => {
                    let detail = entries.get(KEY_GOAL_DETAIL).cloned().unwrap_or_default();
                    session.set_theme(category, detail);
                }
                Err(()) => discarded.extend([KEY_GOAL, KEY_GOAL_DETAIL]),
            }
        }

        if let Some(prompt) = entries.get(KEY_PROMPT) {
            session.set_free_text_prompt(prompt.clone());
        }
        if let Some(origin) = entries.get(KEY_ORIGIN) {
            session.set_origin(origin.clone());
        }

        if let Some(raw) = entries.get(KEY_SELECTED_ROUTE) {
            match serde_json::from_str::<NormalizedRoute>(raw) {
                Ok(route) if route.is_well_formed() => session.attach_route(route),
                Ok(_) => {
                    log::warn!("discarding stored route with an invalid step layout");
                    discarded.push(KEY_SELECTED_ROUTE);
                }
                Err(err) => {
                    log::warn!("discarding unreadable stored route: {err}");
                    discarded.push(KEY_SELECTED_ROUTE);
                }
            }
        }

        RestoredSession { session, discarded }
    }
}

/// Minutes offered by the duration picker: 10, 15, …, 120.
#[must_use]
pub fn duration_choices() -> Vec<u32> {
    (DURATION_MIN_MINUTES..=DURATION_MAX_MINUTES)
        .step_by(DURATION_STEP_MINUTES as usize)
        .collect()
}

/// Whether the picker would offer this value.
#[must_use]
pub const fn is_duration_choice(minutes: u32) -> bool {
    minutes >= DURATION_MIN_MINUTES
        && minutes <= DURATION_MAX_MINUTES
        && (minutes - DURATION_MIN_MINUTES) % DURATION_STEP_MINUTES == 0
}
