//! Directions normalization.
//!
//! Turns whatever directions payload the route service hands back into a
//! [`NormalizedRoute`]. The payload is treated as untrusted JSON: every field
//! is optional, wrong types are ignored, and an empty result falls back to the
//! built-in route so navigation always has something to render.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::constants::{DEFAULT_INSTRUCTION, START_STEP_LABEL};
use crate::request::RouteResponse;
use crate::route::{NormalizedRoute, RouteStep, StepKind, format_distance};

static MARKUP_TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"<[^>]*>").ok());
static WHITESPACE_RUN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s+").ok());

const METERS_PER_MILE: f64 = 1_609.344;

/// Remove markup tags, collapse whitespace runs to one space and trim.
#[must_use]
pub fn strip_html(value: &str) -> String {
    let without_tags = match MARKUP_TAG.as_ref() {
        Some(re) => re.replace_all(value, ""),
        None => value.into(),
    };
    let collapsed = match WHITESPACE_RUN.as_ref() {
        Some(re) => re.replace_all(&without_tags, " ").into_owned(),
        None => without_tags.split_whitespace().collect::<Vec<_>>().join(" "),
    };
    collapsed.trim().to_string()
}

/// Normalize an arbitrary directions payload.
///
/// Accepts either a route object (`{"legs": [...]}`) or a full directions
/// response (`{"routes": [{"legs": [...]}]}`); anything else yields the
/// fallback route.
#[must_use]
pub fn normalize(payload: &Value) -> NormalizedRoute {
    let legs = legs_of(payload);
    let raw_steps: Vec<&Value> = legs.iter().flat_map(|leg| steps_of(leg)).collect();

    if raw_steps.is_empty() {
        log::debug!("directions payload carried no steps; using fallback route");
        return NormalizedRoute::fallback();
    }

    let steps: Vec<RouteStep> = raw_steps
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_step(index, raw))
        .collect();

    let leg_label = match legs.as_slice() {
        [only] => distance_text(only),
        _ => None,
    };

    log::debug!(
        "normalized {} steps from {} leg(s)",
        steps.len(),
        legs.len()
    );
    NormalizedRoute::from_steps(steps, leg_label).unwrap_or_else(NormalizedRoute::fallback)
}

/// Normalize a route-service response, carrying its advisory text along.
#[must_use]
pub fn normalize_response(response: &RouteResponse) -> NormalizedRoute {
    let static_map_url = response
        .route_data
        .get("static_map_url")
        .and_then(Value::as_str)
        .map(str::to_string);
    normalize(&response.route_data).with_advice(
        Some(response.summary.clone()),
        Some(response.explanation.clone()),
        static_map_url,
    )
}

fn legs_of(payload: &Value) -> Vec<&Value> {
    let legs = payload.get("legs").or_else(|| {
        payload
            .get("routes")
            .and_then(Value::as_array)
            .and_then(|routes| routes.first())
            .and_then(|route| route.get("legs"))
    });
    legs.and_then(Value::as_array)
        .map(|legs| legs.iter().filter(|leg| leg.is_object()).collect())
        .unwrap_or_default()
}

fn steps_of(leg: &Value) -> Vec<&Value> {
    leg.get("steps")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().collect())
        .unwrap_or_default()
}

fn normalize_step(index: usize, raw: &Value) -> RouteStep {
    let label = if index == 0 {
        START_STEP_LABEL.to_string()
    } else {
        format!("Step {}", index + 1)
    };
    let kind = if index == 0 {
        StepKind::Start
    } else {
        StepKind::Waypoint
    };

    let instruction = raw
        .get("html_instructions")
        .or_else(|| raw.get("instructions"))
        .and_then(Value::as_str)
        .map(strip_html)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string());

    let distance_label = distance_text(raw)
        .or_else(|| distance_meters(raw).map(|meters| format_distance(meters / METERS_PER_MILE)))
        .unwrap_or_default();

    RouteStep::new(label, instruction, distance_label, kind)
}

fn distance_text(node: &Value) -> Option<String> {
    node.get("distance")
        .and_then(|distance| distance.get("text"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn distance_meters(node: &Value) -> Option<f64> {
    node.get("distance")
        .and_then(|distance| distance.get("value"))
        .and_then(Value::as_f64)
        .filter(|meters| meters.is_finite() && *meters >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_html_removes_tags_and_collapses_whitespace() {
        assert_eq!(strip_html("<b>Turn</b>  left"), "Turn left");
        assert_eq!(
            strip_html("  Head <b>north</b>\n on\tState St "),
            "Head north on State St"
        );
        assert_eq!(strip_html("<div></div>"), "");
    }

    #[test]
    fn empty_shapes_fall_back() {
        for payload in [
            Value::Null,
            json!({}),
            json!([]),
            json!("legs"),
            json!({"legs": []}),
            json!({"legs": [{"steps": []}]}),
            json!({"legs": "nope"}),
            json!({"routes": []}),
        ] {
            let route = normalize(&payload);
            assert_eq!(route, NormalizedRoute::fallback(), "payload {payload}");
        }
    }

    #[test]
    fn labels_and_kinds_follow_position() {
        let payload = json!({
            "legs": [{
                "steps": [
                    {"html_instructions": "Head <b>north</b>", "distance": {"text": "0.2 mi"}},
                    {"html_instructions": "Turn right", "distance": {"text": "0.3 mi"}},
                    {"html_instructions": "", "distance": {"text": "abc"}}
                ]
            }]
        });
        let route = normalize(&payload);
        let labels: Vec<&str> = route.steps().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Start", "Step 2", "Step 3"]);
        assert_eq!(route.steps()[0].kind, StepKind::Start);
        assert!(route.steps()[1..].iter().all(|s| s.kind == StepKind::Waypoint));
        assert_eq!(route.steps()[0].instruction, "Head north");
        assert_eq!(route.steps()[2].instruction, "Continue");
        assert_eq!(route.total_distance_label(), "0.5 mi");
    }

    #[test]
    fn leg_distance_label_wins_over_summed_steps() {
        let payload = json!({
            "legs": [{
                "distance": {"text": "1.8 mi", "value": 2897},
                "steps": [{"distance": {"text": "0.2 mi"}}]
            }]
        });
        assert_eq!(normalize(&payload).total_distance_label(), "1.8 mi");
    }

    #[test]
    fn numeric_only_distance_is_converted_to_miles() {
        let payload = json!({"legs": [{"steps": [{"distance": {"value": 1609.344}}]}]});
        let route = normalize(&payload);
        assert_eq!(route.steps()[0].distance_label, "1.0 mi");
    }

    #[test]
    fn malformed_steps_degrade_instead_of_failing() {
        let payload = json!({
            "routes": [{
                "legs": [
                    {"steps": [null, 7, {"html_instructions": 12, "distance": "far"}]},
                    {"steps": [{"instructions": "Arrive"}]}
                ]
            }]
        });
        let route = normalize(&payload);
        assert_eq!(route.len(), 4);
        assert!(route.steps()[..3].iter().all(|s| s.instruction == "Continue"));
        assert!(route.steps().iter().all(|s| s.distance_label.is_empty()));
        assert_eq!(route.steps()[3].instruction, "Arrive");
        assert_eq!(route.total_distance_label(), "0.0 mi");
    }

    #[test]
    fn response_advice_and_map_are_carried() {
        let response = RouteResponse {
            route_id: 2,
            summary: "Wabash Ave".to_string(),
            explanation: "Quiet and shaded.".to_string(),
            route_data: json!({"static_map_url": "https://maps.example/x.png", "legs": []}),
        };
        let route = normalize_response(&response);
        assert_eq!(route.len(), 4);
        assert_eq!(route.summary(), Some("Wabash Ave"));
        assert_eq!(route.explanation(), Some("Quiet and shaded."));
        assert_eq!(route.static_map_url(), Some("https://maps.example/x.png"));
    }
}
