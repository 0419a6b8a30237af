//! Trip planner: one session, one flow controller and one tracker wired to a
//! storage backend.
use anyhow::Context;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{KEY_MODE, SESSION_KEYS};
use crate::directions::normalize_response;
use crate::flow::{Screen, ScreenFlowController, Transition};
use crate::navigation::{NavigationProgressTracker, TickEvent, TickLease};
use crate::request::{RouteFetchError, RouteFetcher, RouteRequest, RouteResponse};
use crate::route::NormalizedRoute;
use crate::session::{SessionCodecError, TripSession};
use crate::storage::SessionStorage;
use crate::theme::{ThemeCategory, find_preset};

#[derive(Debug, Error)]
pub enum PlannerError<E>
where
    E: std::error::Error + 'static,
{
    #[error("session storage failed: {0}")]
    Storage(#[source] E),
    #[error(transparent)]
    Codec(#[from] SessionCodecError),
    #[error(transparent)]
    Fetch(#[from] RouteFetchError),
}

pub type PlannerResult<T, S> = Result<T, PlannerError<<S as SessionStorage>::Error>>;

/// Drives one planning-to-navigation cycle.
///
/// Every session mutation is written through to the storage backend before
/// the call returns.
pub struct TripPlanner<S>
where
    S: SessionStorage,
{
    storage: S,
    session: TripSession,
    flow: ScreenFlowController,
    tracker: NavigationProgressTracker,
}

impl<S> TripPlanner<S>
where
    S: SessionStorage,
{
    /// Start from an empty session on the intro screen. Storage is not read.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            session: TripSession::new(),
            flow: ScreenFlowController::new(),
            tracker: NavigationProgressTracker::new(),
        }
    }

    /// Rebuild the session persisted in `storage`, discarding corrupted entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read or cleaned up.
    pub fn resume(storage: S) -> Result<Self, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let mut entries = BTreeMap::new();
        for key in SESSION_KEYS {
            if let Some(value) = storage
                .get_item(key)
                .map_err(Into::<anyhow::Error>::into)
                .with_context(|| format!("reading session key `{key}`"))?
            {
                entries.insert(key, value);
            }
        }

        let restored = TripSession::from_entries(&entries);
        for key in &restored.discarded {
            log::warn!("discarding corrupted session entry `{key}`");
            storage
                .remove_item(key)
                .map_err(Into::<anyhow::Error>::into)
                .with_context(|| format!("removing session key `{key}`"))?;
        }

        Ok(Self {
            storage,
            session: restored.session,
            flow: ScreenFlowController::new(),
            tracker: NavigationProgressTracker::new(),
        })
    }

    /// Resume on `screen`, as after a reload. A screen the restored session
    /// cannot satisfy redirects to the start screen with a cleared session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read or written.
    pub fn resume_at(storage: S, screen: Screen) -> Result<Self, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let mut planner = Self::resume(storage)?;
        planner.flow = ScreenFlowController::at(screen);
        let transition = planner.flow.revalidate(&planner.session);
        planner
            .settle(transition)
            .map_err(anyhow::Error::new)
            .context("applying resumed screen")?;
        if transition == Transition::Stayed(Screen::ActiveNavigation) {
            planner.start_navigation();
        }
        Ok(planner)
    }

    /// Set the navigation tick cadence without disturbing a running walk.
    #[must_use]
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.tracker.set_cadence(cadence);
        self
    }

    #[must_use]
    pub const fn session(&self) -> &TripSession {
        &self.session
    }

    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.flow.current()
    }

    #[must_use]
    pub const fn tracker(&self) -> &NavigationProgressTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn set_goal_by_destination(&mut self, destination_name: &str) -> PlannerResult<(), S> {
        self.update(|session| session.set_goal_by_destination(destination_name))
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn set_goal_by_duration(&mut self, minutes: u32) -> PlannerResult<(), S> {
        self.update(|session| session.set_goal_by_duration(minutes))
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn set_theme(&mut self, category: ThemeCategory, detail_label: &str) -> PlannerResult<(), S> {
        self.update(|session| session.set_theme(category, detail_label))
    }

    /// Apply a catalog preset as the theme. Returns `false` for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn select_preset(&mut self, preset_id: &str) -> PlannerResult<bool, S> {
        let Some(preset) = find_preset(preset_id) else {
            log::debug!("unknown theme preset `{preset_id}`");
            return Ok(false);
        };
        self.update(|session| session.set_theme(preset.category, preset.name))?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn set_free_text_prompt(&mut self, prompt: &str) -> PlannerResult<(), S> {
        self.update(|session| session.set_free_text_prompt(prompt))
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn set_origin(&mut self, origin_label: &str) -> PlannerResult<(), S> {
        self.update(|session| session.set_origin(origin_label))
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn attach_route(&mut self, route: NormalizedRoute) -> PlannerResult<(), S> {
        self.update(|session| session.attach_route(route))
    }

    /// Normalize a route-service response and make it the active route.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn apply_route_response(
        &mut self,
        response: &RouteResponse,
    ) -> PlannerResult<&NormalizedRoute, S> {
        let route = normalize_response(response);
        log::info!(
            "route {} attached: {} steps, {}",
            response.route_id,
            route.len(),
            route.total_distance_label()
        );
        self.attach_route(route)?;
        self.session
            .active_route()
            .ok_or(PlannerError::Fetch(RouteFetchError::IncompleteSession))
    }

    /// Ask `fetcher` for a route matching the session and attach it.
    ///
    /// On failure the active route is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Fetch`] when the session has no goal or the
    /// fetch fails, and a storage error if the route cannot be persisted.
    pub async fn fetch_route<F>(&mut self, fetcher: &F) -> PlannerResult<&NormalizedRoute, S>
    where
        F: RouteFetcher + ?Sized,
    {
        let request = RouteRequest::from_session(&self.session)
            .ok_or(RouteFetchError::IncompleteSession)?;
        log::debug!("requesting route via {}", request.path());
        match fetcher.fetch_route(&request).await {
            Ok(response) => self.apply_route_response(&response),
            Err(err) => {
                log::warn!("route fetch failed: {err}");
                Err(err.into())
            }
        }
    }

    /// Show `target`, honoring the screen guards.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn request(&mut self, target: Screen) -> PlannerResult<Transition, S> {
        let transition = self.flow.request(target, &self.session);
        self.settle(transition)?;
        Ok(transition)
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn forward(&mut self) -> PlannerResult<Transition, S> {
        let transition = self.flow.forward(&self.session);
        self.settle(transition)?;
        Ok(transition)
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn back(&mut self) -> PlannerResult<Transition, S> {
        let transition = self.flow.back(&self.session);
        self.settle(transition)?;
        Ok(transition)
    }

    /// Lease for the running navigation timer, if any.
    #[must_use]
    pub fn lease(&self) -> Option<TickLease> {
        self.tracker.lease()
    }

    pub fn tick(&mut self, event: TickEvent) -> usize {
        self.tracker.tick(event)
    }

    pub fn advance(&mut self) -> bool {
        self.tracker.advance()
    }

    #[must_use]
    pub fn recenter(&self) -> &'static str {
        self.tracker.recenter()
    }

    /// Stop navigating and return to the route preview.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted.
    pub fn end_navigation(&mut self) -> PlannerResult<Transition, S> {
        self.tracker.end();
        self.request(Screen::RoutePreview)
    }

    /// Drop everything and go back to the intro screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be cleared.
    pub fn restart(&mut self) -> PlannerResult<Transition, S> {
        self.tracker.restart();
        let transition = self.flow.restart(&mut self.session);
        self.storage.clear().map_err(PlannerError::Storage)?;
        log::info!("trip restarted");
        Ok(transition)
    }

    fn settle(&mut self, transition: Transition) -> PlannerResult<(), S> {
        match transition {
            Transition::Stayed(_) => Ok(()),
            Transition::Redirected { .. } => {
                self.tracker.end();
                self.session.clear();
                self.persist()
            }
            Transition::Entered { from, to } => {
                if from == Screen::ActiveNavigation {
                    self.tracker.end();
                }
                match to {
                    Screen::RoutePreview => self
                        .update(TripSession::commit_prompt_as_theme)
                        .map(|_| ()),
                    Screen::ActiveNavigation => {
                        self.start_navigation();
                        Ok(())
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    fn start_navigation(&mut self) -> TickLease {
        let route = self
            .session
            .active_route()
            .cloned()
            .unwrap_or_else(NormalizedRoute::fallback);
        self.tracker.start(route)
    }

    /// Apply `change` and persist it. If storage rejects the write the
    /// in-memory session is restored and the previous entries are rewritten.
    fn update<T>(&mut self, change: impl FnOnce(&mut TripSession) -> T) -> PlannerResult<T, S> {
        let previous = self.session.clone();
        let outcome = change(&mut self.session);
        if previous == self.session {
            return Ok(outcome);
        }
        if let Err(err) = self.persist() {
            log::warn!("session change rolled back: {err}");
            self.session = previous;
            if let Err(rollback) = self.persist() {
                log::warn!("stored session may be stale: {rollback}");
            }
            return Err(err);
        }
        Ok(outcome)
    }

    /// Field keys are written first, then stale keys removed, then the mode
    /// key. A write that fails partway leaves the stored mode pointing at a
    /// field that is still present.
    fn persist(&self) -> PlannerResult<(), S> {
        let entries = self.session.to_entries()?;
        for key in SESSION_KEYS.into_iter().filter(|key| *key != KEY_MODE) {
            if let Some(value) = entries.get(key) {
                self.storage
                    .set_item(key, value)
                    .map_err(PlannerError::Storage)?;
            }
        }
        for key in SESSION_KEYS {
            if !entries.contains_key(key) {
                self.storage.remove_item(key).map_err(PlannerError::Storage)?;
            }
        }
        if let Some(mode) = entries.get(KEY_MODE) {
            self.storage
                .set_item(KEY_MODE, mode)
                .map_err(PlannerError::Storage)?;
        }
        Ok(())
    }
}
