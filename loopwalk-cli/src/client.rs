use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use loopwalk_core::constants::HEALTH_PATH;
use loopwalk_core::{RouteFetchError, RouteFetcher, RouteRequest, RouteResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// HTTP client for the LoopWalk route service.
#[derive(Debug, Clone)]
pub struct RouteClient {
    client: Client,
    base_url: String,
}

impl RouteClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Ping the service.
    ///
    /// # Errors
    ///
    /// Returns an error when the service is unreachable or unhealthy.
    pub async fn health(&self) -> Result<HealthStatus, RouteFetchError> {
        let response = self
            .client
            .get(self.url(HEALTH_PATH))
            .send()
            .await
            .map_err(|err| RouteFetchError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RouteFetchError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(RouteFetchError::from_status(
                status.as_u16(),
                &body,
                HEALTH_PATH,
            ));
        }
        serde_json::from_str(&body).map_err(|err| RouteFetchError::Decode(err.to_string()))
    }
}

#[async_trait]
impl RouteFetcher for RouteClient {
    async fn fetch_route(&self, request: &RouteRequest) -> Result<RouteResponse, RouteFetchError> {
        let path = request.path();
        debug!("POST {}", self.url(path));

        let response = self
            .client
            .post(self.url(path))
            .json(request)
            .send()
            .await
            .map_err(|err| RouteFetchError::Transport(err.to_string()))?;

        let status = response.status();
        debug!("Route request status: {status}");
        let body = response
            .text()
            .await
            .map_err(|err| RouteFetchError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(RouteFetchError::from_status(status.as_u16(), &body, path));
        }
        serde_json::from_str(&body).map_err(|err| RouteFetchError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use loopwalk_core::TripSession;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, String)>>>;

    fn spawn_server(status: StatusCode, body: &'static str) -> (SocketAddr, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let make_svc = make_service_fn(move |_conn| {
            let recorder = recorder.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let recorder = recorder.clone();
                    async move {
                        let path = req.uri().path().to_string();
                        let bytes = hyper::body::to_bytes(req.into_body())
                            .await
                            .unwrap_or_default();
                        recorder
                            .lock()
                            .unwrap()
                            .push((path, String::from_utf8_lossy(&bytes).into_owned()));
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(status)
                                .header("content-type", "application/json")
                                .body(Body::from(body))
                                .unwrap(),
                        )
                    }
                }))
            }
        });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);
        (addr, seen)
    }

    fn duration_request() -> RouteRequest {
        let mut session = TripSession::new();
        session.set_goal_by_duration(30);
        RouteRequest::from_session(&session).unwrap()
    }

    #[tokio::test]
    async fn posts_to_duration_endpoint_and_decodes() {
        let (addr, seen) = spawn_server(
            StatusCode::OK,
            r#"{"route_id": 3, "summary": "Loop", "explanation": "Short", "route_data": {"legs": []}}"#,
        );
        let client = RouteClient::new(&format!("http://{addr}/api/")).unwrap();
        let response = client.fetch_route(&duration_request()).await.unwrap();
        assert_eq!(response.route_id, 3);
        assert_eq!(response.summary, "Loop");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "/api/route/by-duration");
        let body: serde_json::Value = serde_json::from_str(&seen[0].1).unwrap();
        assert_eq!(body["minutes"], 30);
        assert_eq!(body["origin"], "Current Location");
    }

    #[tokio::test]
    async fn surfaces_structured_error_detail() {
        let (addr, _) = spawn_server(StatusCode::NOT_FOUND, r#"{"detail": "No walk found"}"#);
        let client = RouteClient::new(&format!("http://{addr}/api")).unwrap();
        let err = client.fetch_route(&duration_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed (404): No walk found");
    }

    #[tokio::test]
    async fn empty_server_error_uses_diagnostic() {
        let (addr, _) = spawn_server(StatusCode::INTERNAL_SERVER_ERROR, "");
        let client = RouteClient::new(&format!("http://{addr}/api")).unwrap();
        let err = client.fetch_route(&duration_request()).await.unwrap_err();
        assert_eq!(
            err,
            RouteFetchError::Status {
                status: 500,
                message: loopwalk_core::constants::SERVER_ERROR_FALLBACK_MESSAGE.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let (addr, _) = spawn_server(StatusCode::OK, "not json");
        let client = RouteClient::new(&format!("http://{addr}/api")).unwrap();
        let err = client.fetch_route(&duration_request()).await.unwrap_err();
        assert!(matches!(err, RouteFetchError::Decode(_)));
    }

    #[tokio::test]
    async fn health_reports_status() {
        let (addr, seen) = spawn_server(StatusCode::OK, r#"{"status": "ok"}"#);
        let client = RouteClient::new(&format!("http://{addr}/api")).unwrap();
        assert_eq!(client.health().await.unwrap().status, "ok");
        assert_eq!(seen.lock().unwrap()[0].0, "/api/health");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let client = RouteClient::new("http://127.0.0.1:9").unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, RouteFetchError::Transport(_)));
    }
}
