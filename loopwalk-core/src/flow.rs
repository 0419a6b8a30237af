//! Planning screens and the legality of moving between them.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::session::TripSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    #[default]
    Intro,
    Start,
    GoalSelection,
    RoutePreview,
    ActiveNavigation,
}

impl Screen {
    /// Required forward order.
    pub const ORDER: [Self; 5] = [
        Self::Intro,
        Self::Start,
        Self::GoalSelection,
        Self::RoutePreview,
        Self::ActiveNavigation,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Start => "start",
            Self::GoalSelection => "goal-selection",
            Self::RoutePreview => "route-preview",
            Self::ActiveNavigation => "active-navigation",
        }
    }

    /// Address of the screen in the web front end.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Intro => "/",
            Self::Start => "/start",
            Self::GoalSelection => "/goals",
            Self::RoutePreview => "/walk",
            Self::ActiveNavigation => "/navigate",
        }
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        Self::ORDER
            .into_iter()
            .find(|screen| screen.path().trim_end_matches('/') == trimmed)
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Intro => None,
            Self::Start => Some(Self::Intro),
            Self::GoalSelection => Some(Self::Start),
            Self::RoutePreview => Some(Self::GoalSelection),
            Self::ActiveNavigation => Some(Self::RoutePreview),
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Intro => Some(Self::Start),
            Self::Start => Some(Self::GoalSelection),
            Self::GoalSelection => Some(Self::RoutePreview),
            Self::RoutePreview => Some(Self::ActiveNavigation),
            Self::ActiveNavigation => None,
        }
    }

    /// Whether entering this screen depends on the trip session.
    #[must_use]
    pub const fn is_guarded(self) -> bool {
        matches!(
            self,
            Self::GoalSelection | Self::RoutePreview | Self::ActiveNavigation
        )
    }

    /// Entry guard for this screen.
    #[must_use]
    pub fn admits(self, session: &TripSession) -> bool {
        match self {
            Self::Intro | Self::Start => true,
            Self::GoalSelection => session.is_ready_for_goal_selection(),
            Self::RoutePreview | Self::ActiveNavigation => {
                session.is_ready_for_goal_selection() && session.is_ready_for_route_preview()
            }
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Screen {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|screen| screen.as_str() == s)
            .ok_or(())
    }
}

/// Result of asking the controller to show a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Entered { from: Screen, to: Screen },
    Stayed(Screen),
    /// The guard failed; the flow is now on [`Screen::Start`].
    Redirected { requested: Screen },
}

impl Transition {
    /// Screen the flow ended up on.
    #[must_use]
    pub const fn landed(self) -> Screen {
        match self {
            Self::Entered { to, .. } => to,
            Self::Stayed(screen) => screen,
            Self::Redirected { .. } => Screen::Start,
        }
    }

    #[must_use]
    pub const fn is_redirect(self) -> bool {
        matches!(self, Self::Redirected { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenFlowController {
    current: Screen,
}

impl ScreenFlowController {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: Screen::Intro,
        }
    }

    /// Controller already showing `screen`, e.g. after a page reload. Call
    /// [`Self::revalidate`] before trusting it.
    #[must_use]
    pub const fn at(screen: Screen) -> Self {
        Self { current: screen }
    }

    #[must_use]
    pub const fn current(&self) -> Screen {
        self.current
    }

    /// Move to `target`.
    ///
    /// Stepping back one screen and jumping to the intro or start screens are
    /// always allowed. Anything else is admitted only when the target's guard
    /// passes; otherwise the flow lands on [`Screen::Start`].
    pub fn request(&mut self, target: Screen, session: &TripSession) -> Transition {
        let from = self.current;
        if target == from {
            return Transition::Stayed(from);
        }
        if from.previous() == Some(target) || target.admits(session) {
            log::debug!("screen {from} -> {target}");
            self.current = target;
            return Transition::Entered { from, to: target };
        }
        log::warn!("{target} requires more trip details; redirecting to start");
        self.current = Screen::Start;
        Transition::Redirected { requested: target }
    }

    /// Move to the next screen in order, if any.
    pub fn forward(&mut self, session: &TripSession) -> Transition {
        match self.current.next() {
            Some(next) => self.request(next, session),
            None => Transition::Stayed(self.current),
        }
    }

    /// Move to the preceding screen, if any.
    pub fn back(&mut self, session: &TripSession) -> Transition {
        match self.current.previous() {
            Some(previous) => self.request(previous, session),
            None => Transition::Stayed(self.current),
        }
    }

    /// Re-check the current screen's guard against `session`.
    pub fn revalidate(&mut self, session: &TripSession) -> Transition {
        if self.current.admits(session) {
            return Transition::Stayed(self.current);
        }
        let requested = self.current;
        log::warn!("{requested} no longer valid for this trip; redirecting to start");
        self.current = Screen::Start;
        Transition::Redirected { requested }
    }

    /// Go back to the intro screen with an empty session.
    pub fn restart(&mut self, session: &mut TripSession) -> Transition {
        session.clear();
        let from = self.current;
        self.current = Screen::Intro;
        if from == Screen::Intro {
            Transition::Stayed(from)
        } else {
            Transition::Entered {
                from,
                to: Screen::Intro,
            }
        }
    }
}
