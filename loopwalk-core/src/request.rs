//! Route-service wire types and the fetcher seam.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::{
    ROUTE_BY_DESTINATION_PATH, ROUTE_BY_DURATION_PATH, SERVER_ERROR_FALLBACK_MESSAGE,
    UNTHEMED_USER_QUERY,
};
use crate::session::{TravelGoal, TripSession};
use crate::theme::ThemeCategory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRouteRequest {
    pub origin: String,
    pub destination: String,
    pub user_query: String,
    pub enrichment_queries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRouteRequest {
    pub origin: String,
    pub minutes: u32,
    pub user_query: String,
    pub enrichment_queries: Vec<String>,
}

/// Body of a route request; the variant decides the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteRequest {
    ByDestination(DestinationRouteRequest),
    ByDuration(DurationRouteRequest),
}

impl RouteRequest {
    /// Build the request a session is ready to send.
    ///
    /// Returns `None` while the session has no usable travel goal.
    #[must_use]
    pub fn from_session(session: &TripSession) -> Option<Self> {
        if !session.is_ready_for_goal_selection() {
            return None;
        }
        let origin = session.origin_label().to_string();
        let user_query = user_query_for(session);
        let enrichment_queries = session
            .theme_category()
            .enrichment_queries()
            .iter()
            .map(|query| (*query).to_string())
            .collect();

        match session.goal()? {
            TravelGoal::Destination(destination) => {
                Some(Self::ByDestination(DestinationRouteRequest {
                    origin,
                    destination: destination.trim().to_string(),
                    user_query,
                    enrichment_queries,
                }))
            }
            TravelGoal::Duration(minutes) => Some(Self::ByDuration(DurationRouteRequest {
                origin,
                minutes: *minutes,
                user_query,
                enrichment_queries,
            })),
        }
    }

    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::ByDestination(_) => ROUTE_BY_DESTINATION_PATH,
            Self::ByDuration(_) => ROUTE_BY_DURATION_PATH,
        }
    }

    #[must_use]
    pub fn user_query(&self) -> &str {
        match self {
            Self::ByDestination(request) => &request.user_query,
            Self::ByDuration(request) => &request.user_query,
        }
    }
}

fn user_query_for(session: &TripSession) -> String {
    match session.theme_category() {
        ThemeCategory::None => session
            .free_text_prompt()
            .map_or_else(|| UNTHEMED_USER_QUERY.to_string(), str::to_string),
        ThemeCategory::CustomText => session.theme_detail().to_string(),
        category => format!(
            "{} walk: {}",
            category.display_name(),
            session.theme_detail()
        ),
    }
}

/// Recommendation returned by the route service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub route_id: i64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub explanation: String,
    /// Raw directions payload, normalized by [`crate::directions::normalize`].
    #[serde(default)]
    pub route_data: Value,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteFetchError {
    #[error("trip session is missing a destination or duration")]
    IncompleteSession,
    #[error("route service unreachable: {0}")]
    Transport(String),
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("unreadable route response: {0}")]
    Decode(String),
}

impl RouteFetchError {
    /// Build a status failure from a non-success response body.
    #[must_use]
    pub fn from_status(status: u16, body: &str, path: &str) -> Self {
        Self::Status {
            status,
            message: extract_error_message(status, body, path),
        }
    }
}

/// Pick the most useful message out of an error response body.
///
/// Structured `detail`/`error`/`message` fields win, then the raw body; a
/// server error with an empty body gets a fixed diagnostic and anything else
/// falls back to the request path.
#[must_use]
pub fn extract_error_message(status: u16, body: &str, path: &str) -> String {
    let body = body.trim();
    if let Some(message) = serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(structured_message)
    {
        return message;
    }
    if !body.is_empty() {
        return body.to_string();
    }
    if (500..600).contains(&status) {
        return SERVER_ERROR_FALLBACK_MESSAGE.to_string();
    }
    path.to_string()
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn structured_message(value: &Value) -> Option<String> {
    if let Some(detail) = value.get("detail") {
        match detail {
            Value::String(text) => return non_empty(text),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .filter_map(|item| {
                        item.get("msg")
                            .and_then(Value::as_str)
                            .or_else(|| item.as_str())
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                if let Some(message) = non_empty(&joined) {
                    return Some(message);
                }
            }
            _ => {}
        }
    }
    for key in ["error", "message"] {
        match value.get(key) {
            Some(Value::String(text)) => {
                if let Some(message) = non_empty(text) {
                    return Some(message);
                }
            }
            Some(nested @ Value::Object(_)) => {
                if let Some(message) = nested
                    .get("message")
                    .and_then(Value::as_str)
                    .and_then(non_empty)
                {
                    return Some(message);
                }
            }
            _ => {}
        }
    }
    None
}

/// Anything that can turn a [`RouteRequest`] into a [`RouteResponse`].
#[async_trait]
pub trait RouteFetcher {
    /// Ask the route service for a recommendation.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteFetchError`] when the service is unreachable, answers
    /// with a non-success status, or sends an unreadable body.
    async fn fetch_route(&self, request: &RouteRequest) -> Result<RouteResponse, RouteFetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn incomplete_session_builds_no_request() {
        assert!(RouteRequest::from_session(&TripSession::new()).is_none());
        let mut session = TripSession::new();
        session.set_goal_by_destination("  ");
        assert!(RouteRequest::from_session(&session).is_none());
    }

    #[test]
    fn destination_request_carries_theme_query() {
        let mut session = TripSession::new();
        session.set_goal_by_destination("Willis Tower");
        session.set_theme(ThemeCategory::Historic, "Marquette Building");
        let request = RouteRequest::from_session(&session).expect("request");
        assert_eq!(request.path(), "/route");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "origin": "Current Location",
                "destination": "Willis Tower",
                "user_query": "Historic walk: Marquette Building",
                "enrichment_queries": ["landmark", "museum"]
            })
        );
    }

    #[test]
    fn duration_request_uses_prompt_when_unthemed() {
        let mut session = TripSession::new();
        session.set_goal_by_duration(40);
        session.set_origin("Union Station");
        session.set_free_text_prompt("murals and street art");
        let request = RouteRequest::from_session(&session).expect("request");
        assert_eq!(request.path(), "/route/by-duration");
        assert_eq!(request.user_query(), "murals and street art");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["minutes"], 40);
        assert_eq!(body["origin"], "Union Station");
        assert_eq!(body["enrichment_queries"], json!(["cafe"]));

        session.set_free_text_prompt("");
        let request = RouteRequest::from_session(&session).expect("request");
        assert_eq!(request.user_query(), UNTHEMED_USER_QUERY);
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let response: RouteResponse = serde_json::from_str(r#"{"summary": "Loop"}"#).unwrap();
        assert_eq!(response.route_id, 0);
        assert_eq!(response.summary, "Loop");
        assert!(response.route_data.is_null());
    }

    #[test]
    fn error_message_preference_order() {
        assert_eq!(
            extract_error_message(404, r#"{"detail": "No route found"}"#, "/route"),
            "No route found"
        );
        assert_eq!(
            extract_error_message(
                422,
                r#"{"detail": [{"msg": "field required"}, {"msg": "bad minutes"}]}"#,
                "/route"
            ),
            "field required; bad minutes"
        );
        assert_eq!(
            extract_error_message(400, r#"{"error": {"message": "quota"}}"#, "/route"),
            "quota"
        );
        assert_eq!(
            extract_error_message(502, "Bad Gateway", "/route"),
            "Bad Gateway"
        );
        assert_eq!(
            extract_error_message(500, "", "/route"),
            SERVER_ERROR_FALLBACK_MESSAGE
        );
        assert_eq!(extract_error_message(404, "  ", "/route"), "/route");
    }

    #[test]
    fn status_error_display_matches_client_wording() {
        let err = RouteFetchError::from_status(404, r#"{"detail": "nope"}"#, "/route");
        assert_eq!(err.to_string(), "Request failed (404): nope");
    }
}
