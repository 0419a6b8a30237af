use anyhow::{Result, ensure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};

use loopwalk_core::{
    MemoryStorage, NormalizedRoute, RouteFetchError, RouteFetcher, RouteRequest, RouteResponse,
    Screen, SessionStorage, StepKind, ThemeCategory, TickEvent, TripPlanner, TripSession,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// One scripted pass through the planning flow.
#[async_trait(?Send)]
pub trait FlowScenario {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<()>;
}

/// Run a scenario and capture its outcome.
pub async fn run_scenario(scenario: &dyn FlowScenario) -> ScenarioResult {
    let started = Instant::now();
    let outcome = scenario.run().await;
    let duration = started.elapsed();
    ScenarioResult {
        scenario_name: scenario.name().to_string(),
        passed: outcome.is_ok(),
        failures: outcome
            .err()
            .map(|err| vec![format!("{err:#}")])
            .unwrap_or_default(),
        duration,
    }
}

/// Route fetcher answering every request with the same outcome.
pub struct StubFetcher {
    outcome: Result<RouteResponse, RouteFetchError>,
}

impl StubFetcher {
    pub fn answering(response: RouteResponse) -> Self {
        Self {
            outcome: Ok(response),
        }
    }

    pub fn failing(err: RouteFetchError) -> Self {
        Self { outcome: Err(err) }
    }
}

#[async_trait]
impl RouteFetcher for StubFetcher {
    async fn fetch_route(&self, _request: &RouteRequest) -> Result<RouteResponse, RouteFetchError> {
        self.outcome.clone()
    }
}

fn canned_response() -> RouteResponse {
    RouteResponse {
        route_id: 11,
        summary: "LaSalle St to the Riverwalk".to_string(),
        explanation: "Follows the Dark Knight chase route.".to_string(),
        route_data: json!({
            "static_map_url": "https://maps.example/loop.png",
            "legs": [{
                "distance": {"text": "1.2 mi"},
                "steps": [
                    {"html_instructions": "Head <b>north</b> on <b>S LaSalle St</b>", "distance": {"text": "0.4 mi"}},
                    {"html_instructions": "Turn <b>right</b> onto <b>W Wacker Dr</b>", "distance": {"text": "0.3 mi"}},
                    {"html_instructions": "Continue onto the Riverwalk", "distance": {"text": "0.3 mi"}},
                    {"html_instructions": "Arrive at <b>Michigan Ave</b>", "distance": {"text": "0.2 mi"}}
                ]
            }]
        }),
    }
}

fn walk_to_end<S: SessionStorage>(planner: &mut TripPlanner<S>) -> Result<usize> {
    let lease = planner
        .lease()
        .ok_or_else(|| anyhow::anyhow!("navigation did not start"))?;
    let cadence = planner.tracker().cadence();
    let mut ticks = 0;
    while !planner.tracker().is_at_last_step() {
        ensure!(ticks < 100, "navigation never reached the last step");
        planner.tick(TickEvent::new(lease, cadence));
        ticks += 1;
    }
    Ok(ticks)
}

pub struct SmokeScenario;

#[async_trait(?Send)]
impl FlowScenario for SmokeScenario {
    fn name(&self) -> &'static str {
        "Smoke Test"
    }

    async fn run(&self) -> Result<()> {
        let route = loopwalk_core::normalize(&serde_json::Value::Null);
        ensure!(route.len() == 4, "fallback route should have 4 steps");
        ensure!(
            route.steps()[0].kind == StepKind::Start,
            "fallback route must open with a start step"
        );
        ensure!(
            loopwalk_core::strip_html("<b>Turn</b>  left") == "Turn left",
            "markup should be stripped"
        );
        let mut planner = TripPlanner::new(MemoryStorage::new());
        ensure!(planner.forward()?.landed() == Screen::Start, "intro leads to start");
        Ok(())
    }
}

pub struct DestinationFlowScenario;

#[async_trait(?Send)]
impl FlowScenario for DestinationFlowScenario {
    fn name(&self) -> &'static str {
        "Destination Flow"
    }

    async fn run(&self) -> Result<()> {
        let storage = MemoryStorage::new();
        let mut planner = TripPlanner::new(storage.clone()).with_cadence(Duration::from_secs(8));
        planner.forward()?;
        planner.set_goal_by_destination("Michigan Ave Bridge")?;
        ensure!(
            planner.forward()?.landed() == Screen::GoalSelection,
            "destination should unlock goal selection"
        );
        planner.select_preset("lasalle")?;
        ensure!(
            planner.forward()?.landed() == Screen::RoutePreview,
            "preset should unlock route preview"
        );

        let fetcher = StubFetcher::answering(canned_response());
        let route = planner.fetch_route(&fetcher).await?;
        ensure!(route.len() == 4, "expected 4 steps, got {}", route.len());
        ensure!(
            route.total_distance_label() == "1.2 mi",
            "leg distance should win, got {}",
            route.total_distance_label()
        );

        ensure!(
            planner.forward()?.landed() == Screen::ActiveNavigation,
            "route preview should lead to navigation"
        );
        let ticks = walk_to_end(&mut planner)?;
        ensure!(ticks == 3, "expected 3 ticks, took {ticks}");
        ensure!(
            (planner.tracker().percent_complete() - 100.0).abs() < f64::EPSILON,
            "walk should finish at 100%"
        );
        ensure!(
            planner.end_navigation()?.landed() == Screen::RoutePreview,
            "ending navigation returns to route preview"
        );
        ensure!(
            storage.get_item("selectedRoute")?.is_some(),
            "route should stay persisted after navigation"
        );
        Ok(())
    }
}

pub struct DurationFlowScenario;

#[async_trait(?Send)]
impl FlowScenario for DurationFlowScenario {
    fn name(&self) -> &'static str {
        "Duration Flow"
    }

    async fn run(&self) -> Result<()> {
        let mut planner = TripPlanner::new(MemoryStorage::new());
        planner.request(Screen::Start)?;
        planner.set_goal_by_destination("Navy Pier")?;
        planner.set_goal_by_duration(45)?;
        ensure!(
            planner.session().destination_name().is_none(),
            "duration goal must clear the destination"
        );
        planner.forward()?;
        planner.set_free_text_prompt("quiet courtyards and murals")?;
        planner.forward()?;
        ensure!(
            planner.session().theme_category() == ThemeCategory::CustomText,
            "free-text prompt should become the custom theme"
        );
        let request = RouteRequest::from_session(planner.session())
            .ok_or_else(|| anyhow::anyhow!("session should build a request"))?;
        ensure!(
            request.path() == "/route/by-duration",
            "duration goal should hit the duration endpoint"
        );
        planner.forward()?;
        ensure!(
            planner.tracker().route() == Some(&NormalizedRoute::fallback()),
            "navigation without a fetched route uses the fallback"
        );
        Ok(())
    }
}

pub struct RedirectScenario;

#[async_trait(?Send)]
impl FlowScenario for RedirectScenario {
    fn name(&self) -> &'static str {
        "Guard Redirect"
    }

    async fn run(&self) -> Result<()> {
        let storage = MemoryStorage::new();
        let mut planner = TripPlanner::new(storage.clone());
        planner.set_theme(ThemeCategory::Historic, "Field Building")?;
        let transition = planner.request(Screen::RoutePreview)?;
        ensure!(transition.is_redirect(), "missing goal must redirect");
        ensure!(planner.screen() == Screen::Start, "redirect lands on start");
        ensure!(
            planner.session() == &TripSession::default(),
            "redirect clears the session"
        );
        ensure!(storage.is_empty(), "redirect clears persisted entries");
        Ok(())
    }
}

pub struct RestartScenario;

#[async_trait(?Send)]
impl FlowScenario for RestartScenario {
    fn name(&self) -> &'static str {
        "Restart Mid-Walk"
    }

    async fn run(&self) -> Result<()> {
        let storage = MemoryStorage::new();
        let mut planner = TripPlanner::new(storage.clone()).with_cadence(Duration::from_secs(8));
        planner.set_goal_by_duration(30)?;
        planner.select_preset("cozy-cafes")?;
        planner.request(Screen::ActiveNavigation)?;
        let lease = planner
            .lease()
            .ok_or_else(|| anyhow::anyhow!("navigation did not start"))?;
        planner.tick(TickEvent::new(lease, Duration::from_secs(8)));

        ensure!(
            planner.restart()?.landed() == Screen::Intro,
            "restart returns to intro"
        );
        let late = planner.tick(TickEvent::new(lease, Duration::from_secs(64)));
        ensure!(late == 0, "ticks after restart must be ignored");
        ensure!(storage.is_empty(), "restart clears storage");
        Ok(())
    }
}

pub struct CorruptedStorageScenario;

#[async_trait(?Send)]
impl FlowScenario for CorruptedStorageScenario {
    fn name(&self) -> &'static str {
        "Corrupted Storage"
    }

    async fn run(&self) -> Result<()> {
        let storage = MemoryStorage::new();
        storage.set_item("mode", "duration")?;
        storage.set_item("duration", "25")?;
        storage.set_item("goal", "food")?;
        storage.set_item("goalDetail", "Cozy Cafes")?;
        storage.set_item("selectedRoute", "{\"steps\": 4")?;

        let planner = TripPlanner::resume_at(storage.clone(), Screen::ActiveNavigation)?;
        ensure!(
            planner.session().duration_minutes() == Some(25),
            "valid entries should survive"
        );
        ensure!(
            planner.session().active_route().is_none(),
            "corrupted route should be dropped"
        );
        ensure!(
            storage.get_item("selectedRoute")?.is_none(),
            "corrupted entry should be removed from storage"
        );
        ensure!(
            planner.tracker().route() == Some(&NormalizedRoute::fallback()),
            "navigation should fall back to the built-in route"
        );
        Ok(())
    }
}

pub struct FetchFailureScenario;

#[async_trait(?Send)]
impl FlowScenario for FetchFailureScenario {
    fn name(&self) -> &'static str {
        "Fetch Failure"
    }

    async fn run(&self) -> Result<()> {
        let mut planner = TripPlanner::new(MemoryStorage::new());
        planner.set_goal_by_destination("Willis Tower")?;
        planner.select_preset("rookery")?;

        let good = StubFetcher::answering(canned_response());
        planner.fetch_route(&good).await?;
        let before = planner.session().active_route().cloned();

        let bad = StubFetcher::failing(RouteFetchError::from_status(503, "", "/route"));
        let err = match planner.fetch_route(&bad).await {
            Ok(_) => anyhow::bail!("failing fetcher should surface an error"),
            Err(err) => err.to_string(),
        };
        ensure!(
            err.starts_with("Request failed (503):"),
            "unexpected error text: {err}"
        );
        ensure!(
            planner.session().active_route().cloned() == before,
            "failed fetch must keep the previous route"
        );
        Ok(())
    }
}

pub fn get_scenario(name: &str) -> Option<Box<dyn FlowScenario>> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(Box::new(SmokeScenario)),
        "destination-flow" | "destination" => Some(Box::new(DestinationFlowScenario)),
        "duration-flow" | "duration" => Some(Box::new(DurationFlowScenario)),
        "redirect" => Some(Box::new(RedirectScenario)),
        "restart" => Some(Box::new(RestartScenario)),
        "corrupted-storage" | "corrupted" => Some(Box::new(CorruptedStorageScenario)),
        "fetch-failure" => Some(Box::new(FetchFailureScenario)),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("destination-flow", "Destination Flow"),
        ("duration-flow", "Duration Flow"),
        ("redirect", "Guard Redirect"),
        ("restart", "Restart Mid-Walk"),
        ("corrupted-storage", "Corrupted Storage"),
        ("fetch-failure", "Fetch Failure"),
    ]
}
