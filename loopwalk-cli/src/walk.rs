use anyhow::{Context, Result, bail};
use chrono::Local;
use colored::Colorize;
use std::time::Duration;

use loopwalk_core::constants::{
    DEFAULT_DURATION_MINUTES, DURATION_MAX_MINUTES, DURATION_MIN_MINUTES, DURATION_STEP_MINUTES,
};
use loopwalk_core::{
    MemoryStorage, NavigationProgressTracker, RouteRequest, Screen, ThemeCategory, TripPlanner,
    find_preset, is_duration_choice,
};

use crate::client::RouteClient;
use crate::ticker::TickerGuard;

/// Everything `walk` mode needs to plan one trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkPlan {
    pub api_base_url: String,
    pub destination: Option<String>,
    pub minutes: Option<u32>,
    pub origin: Option<String>,
    pub theme: Option<String>,
    pub detail: Option<String>,
    pub prompt: Option<String>,
    pub cadence: Duration,
    pub max_ticks: Option<usize>,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkSummary {
    pub steps: usize,
    pub ticks: usize,
    pub percent_complete: f64,
    pub used_fallback: bool,
}

/// Reject durations the picker would never offer.
pub fn validate_minutes(minutes: u32) -> Result<u32> {
    if is_duration_choice(minutes) {
        Ok(minutes)
    } else {
        bail!(
            "--minutes must be between {DURATION_MIN_MINUTES} and {DURATION_MAX_MINUTES} in steps of {DURATION_STEP_MINUTES}, got {minutes}"
        )
    }
}

/// How `--theme` resolved: a catalog preset, or a category with a detail label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeChoice<'a> {
    Preset(&'a str),
    Category(ThemeCategory),
}

pub fn parse_theme(theme: &str) -> Result<ThemeChoice<'_>> {
    if find_preset(theme).is_some() {
        return Ok(ThemeChoice::Preset(theme));
    }
    match theme.parse::<ThemeCategory>() {
        Ok(ThemeCategory::None) | Err(()) => bail!(
            "unknown theme `{theme}`; use historic, movie, energy, food, custom or a preset id"
        ),
        Ok(category) => Ok(ThemeChoice::Category(category)),
    }
}

/// Fill the planner from the plan and walk it up to the route preview.
pub fn plan_trip(planner: &mut TripPlanner<MemoryStorage>, plan: &WalkPlan) -> Result<()> {
    planner.forward()?;
    if let Some(origin) = &plan.origin {
        planner.set_origin(origin)?;
    }
    match (&plan.destination, plan.minutes) {
        (Some(destination), _) => planner.set_goal_by_destination(destination)?,
        (None, Some(minutes)) => planner.set_goal_by_duration(validate_minutes(minutes)?)?,
        (None, None) => planner.set_goal_by_duration(DEFAULT_DURATION_MINUTES)?,
    }
    if planner.forward()?.is_redirect() {
        bail!("a destination or duration is required");
    }

    if let Some(theme) = &plan.theme {
        match parse_theme(theme)? {
            ThemeChoice::Preset(id) => {
                planner.select_preset(id)?;
            }
            ThemeChoice::Category(category) => {
                planner.set_theme(category, plan.detail.as_deref().unwrap_or_default())?;
            }
        }
    }
    if let Some(prompt) = &plan.prompt {
        planner.set_free_text_prompt(prompt)?;
    }
    if planner.forward()?.is_redirect() {
        bail!("choose a --theme or give a --prompt before previewing a route");
    }
    Ok(())
}

pub async fn run_walk(plan: &WalkPlan) -> Result<WalkSummary> {
    if let Some(minutes) = plan.minutes {
        validate_minutes(minutes)?;
    }
    let client = RouteClient::new(&plan.api_base_url)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("route service at {} is not healthy", client.base_url()))?;
    log::info!("route service status: {}", health.status);

    let mut planner = TripPlanner::new(MemoryStorage::new()).with_cadence(plan.cadence);
    plan_trip(&mut planner, plan)?;

    if plan.verbose {
        if let Some(request) = RouteRequest::from_session(planner.session()) {
            println!(
                "📨 {} {}",
                request.path(),
                serde_json::to_string(&request).unwrap_or_default()
            );
        }
    }

    let mut used_fallback = false;
    match planner.fetch_route(&client).await {
        Ok(route) => {
            println!("{}", "🗺️  Route Preview".bright_blue().bold());
            if let Some(summary) = route.summary() {
                println!("   {}", summary.bold());
            }
            if let Some(explanation) = route.explanation() {
                println!("   {explanation}");
            }
            println!(
                "   {} steps, {}",
                route.len(),
                route.total_distance_label()
            );
        }
        Err(err) => {
            eprintln!("❌ {err}");
            println!("{}", "Continuing with the built-in route".yellow());
            used_fallback = true;
        }
    }

    let transition = planner.request(Screen::ActiveNavigation)?;
    if transition.landed() != Screen::ActiveNavigation {
        bail!("navigation could not start from {}", planner.screen());
    }
    let lease = planner
        .lease()
        .context("navigation started without a timer lease")?;

    println!("{}", "🚶 Navigating".bright_green().bold());
    print_progress(planner.tracker());

    let (guard, mut events) = TickerGuard::spawn(lease, plan.cadence);
    let mut ticks = 0;
    while !planner.tracker().is_at_last_step() {
        if plan.max_ticks.is_some_and(|max| ticks >= max) {
            println!("{}", "⏹️  Tick limit reached".yellow());
            break;
        }
        let Some(event) = events.recv().await else {
            break;
        };
        ticks += 1;
        if planner.tick(event) > 0 {
            print_progress(planner.tracker());
        }
    }
    guard.stop();

    let summary = WalkSummary {
        steps: planner.tracker().route().map_or(0, |route| route.len()),
        ticks,
        percent_complete: planner.tracker().percent_complete(),
        used_fallback,
    };
    if planner.tracker().is_at_last_step() {
        println!("{}", "🏁 You have arrived".bright_green().bold());
    }
    planner.end_navigation()?;
    Ok(summary)
}

fn print_progress(tracker: &NavigationProgressTracker) {
    let (Some(index), Some(step), Some(route)) =
        (tracker.current_index(), tracker.current_step(), tracker.route())
    else {
        return;
    };
    println!(
        "[{}] {}/{} {} - {} ({:.0}% complete, {} to go)",
        Local::now().format("%H:%M:%S"),
        index + 1,
        route.len(),
        step.label.bold(),
        step.instruction,
        tracker.percent_complete(),
        tracker.remaining_distance_label()
    );
    if let Some(next) = tracker.next_step() {
        println!("      next: {}", next.instruction.dimmed());
    }
}
