//! Canonical route model shared by the normalizer, the session and the tracker.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{DISTANCE_UNIT_SUFFIX, FALLBACK_ROUTE_ROWS};

static LEADING_NUMBER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Start,
    Waypoint,
    Destination,
}

impl StepKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Waypoint => "waypoint",
            Self::Destination => "destination",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a normalized route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    pub label: String,
    pub instruction: String,
    #[serde(default)]
    pub distance_label: String,
    pub kind: StepKind,
}

impl RouteStep {
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        instruction: impl Into<String>,
        distance_label: impl Into<String>,
        kind: StepKind,
    ) -> Self {
        Self {
            label: label.into(),
            instruction: instruction.into(),
            distance_label: distance_label.into(),
            kind,
        }
    }

    /// Numeric portion of the distance label, `0.0` when it has none.
    #[must_use]
    pub fn distance_value(&self) -> f64 {
        parse_distance_value(&self.distance_label).unwrap_or(0.0)
    }
}

/// UI-agnostic step sequence derived from a directions payload or the
/// built-in fallback.
///
/// Always holds at least one step and the first step is always
/// [`StepKind::Start`]. Once attached to a session it is only ever replaced,
/// never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRoute {
    steps: Vec<RouteStep>,
    total_distance_label: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    static_map_url: Option<String>,
}

impl NormalizedRoute {
    /// Build a route from already-labelled steps.
    ///
    /// Returns `None` when `steps` is empty or does not open with a start step.
    #[must_use]
    pub fn from_steps(steps: Vec<RouteStep>, total_distance_label: Option<String>) -> Option<Self> {
        if steps.first().map(|step| step.kind) != Some(StepKind::Start) {
            return None;
        }
        let total_distance_label = total_distance_label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| format_distance(sum_step_distances(&steps)));
        Some(Self {
            steps,
            total_distance_label,
            summary: None,
            explanation: None,
            static_map_url: None,
        })
    }

    /// The fixed four-step route shown when no directions are available.
    #[must_use]
    pub fn fallback() -> Self {
        let steps: Vec<RouteStep> = FALLBACK_ROUTE_ROWS
            .iter()
            .enumerate()
            .map(|(index, (label, instruction, distance))| {
                let kind = if index == 0 {
                    StepKind::Start
                } else {
                    StepKind::Waypoint
                };
                RouteStep::new(*label, *instruction, *distance, kind)
            })
            .collect();
        let total_distance_label = format_distance(sum_step_distances(&steps));
        Self {
            steps,
            total_distance_label,
            summary: None,
            explanation: None,
            static_map_url: None,
        }
    }

    /// Attach recommender advice while the route is still being assembled.
    #[must_use]
    pub fn with_advice(
        mut self,
        summary: Option<String>,
        explanation: Option<String>,
        static_map_url: Option<String>,
    ) -> Self {
        self.summary = non_blank(summary);
        self.explanation = non_blank(explanation);
        self.static_map_url = non_blank(static_map_url);
        self
    }

    #[must_use]
    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&RouteStep> {
        self.steps.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Only true for a malformed route read back from storage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn total_distance_label(&self) -> &str {
        &self.total_distance_label
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn static_map_url(&self) -> Option<&str> {
        self.static_map_url.as_deref()
    }

    #[must_use]
    pub fn waypoint_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.kind == StepKind::Waypoint)
            .count()
    }

    /// Structural check used when rehydrating a persisted route.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let starts = self
            .steps
            .iter()
            .filter(|step| step.kind == StepKind::Start)
            .count();
        let destinations: Vec<usize> = self
            .steps
            .iter()
            .enumerate()
            .filter(|(_, step)| step.kind == StepKind::Destination)
            .map(|(index, _)| index)
            .collect();
        let destination_ok = match destinations.as_slice() {
            [] => true,
            [index] => *index == self.steps.len() - 1,
            _ => false,
        };
        self.steps.first().map(|step| step.kind) == Some(StepKind::Start)
            && starts == 1
            && destination_ok
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Leading numeric portion of a distance label (`"0.2 mi"` → `0.2`).
#[must_use]
pub fn parse_distance_value(label: &str) -> Option<f64> {
    LEADING_NUMBER
        .as_ref()
        .and_then(|re| re.find(label))
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Sum of the numeric portions of each step's distance label.
#[must_use]
pub fn sum_step_distances(steps: &[RouteStep]) -> f64 {
    steps.iter().map(RouteStep::distance_value).sum()
}

/// One-decimal distance with the fixed unit suffix.
#[must_use]
pub fn format_distance(value: f64) -> String {
    format!("{value:.1} {DISTANCE_UNIT_SUFFIX}")
}
