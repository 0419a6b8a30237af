//! Simulated turn-by-turn progress along a normalized route.
//!
//! The tracker itself never schedules anything. A timer owned by the
//! navigation view hands it [`TickEvent`]s stamped with the [`TickLease`]
//! returned from [`NavigationProgressTracker::start`]; once navigation ends or
//! restarts every outstanding lease goes stale and late ticks are ignored.
use std::time::Duration;

use crate::constants::{DEFAULT_TICK_CADENCE, RECENTER_NOTICE};
use crate::route::{NormalizedRoute, RouteStep, format_distance, sum_step_distances};

/// Proof that a timer belongs to the current navigation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickLease {
    generation: u64,
}

impl TickLease {
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

/// One periodic timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickEvent {
    pub lease: TickLease,
    pub elapsed: Duration,
}

impl TickEvent {
    #[must_use]
    pub const fn new(lease: TickLease, elapsed: Duration) -> Self {
        Self { lease, elapsed }
    }
}

/// Where the flow goes after navigation stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationExit {
    ReturnToRoutePreview,
    RestartFromIntro,
}

#[derive(Debug, Clone)]
struct ActiveNavigation {
    route: NormalizedRoute,
    current: usize,
    accumulated: Duration,
    lease: TickLease,
}

#[derive(Debug, Clone)]
pub struct NavigationProgressTracker {
    cadence: Duration,
    generation: u64,
    active: Option<ActiveNavigation>,
}

impl Default for NavigationProgressTracker {
    fn default() -> Self {
        Self::with_cadence(DEFAULT_TICK_CADENCE)
    }
}

impl NavigationProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero cadence advances once per tick regardless of elapsed time.
    #[must_use]
    pub const fn with_cadence(cadence: Duration) -> Self {
        Self {
            cadence,
            generation: 0,
            active: None,
        }
    }

    #[must_use]
    pub const fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Change the cadence. A running navigation keeps its step and lease.
    pub fn set_cadence(&mut self, cadence: Duration) {
        self.cadence = cadence;
    }

    /// Begin navigating `route` at its first step.
    ///
    /// Any previous run is discarded and its lease invalidated.
    pub fn start(&mut self, route: NormalizedRoute) -> TickLease {
        self.generation = self.generation.wrapping_add(1);
        let lease = TickLease {
            generation: self.generation,
        };
        log::debug!(
            "navigation started on {} steps (lease {})",
            route.len(),
            lease.generation
        );
        self.active = Some(ActiveNavigation {
            route,
            current: 0,
            accumulated: Duration::ZERO,
            lease,
        });
        lease
    }

    /// Move to the next step. Returns `false` when already at the last step
    /// or when navigation is not active.
    pub fn advance(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.current + 1 < active.route.len() {
            active.current += 1;
            true
        } else {
            false
        }
    }

    /// Feed one timer firing. Returns how many steps were advanced.
    ///
    /// Ticks carrying a stale lease, or arriving while inactive, have no effect.
    pub fn tick(&mut self, event: TickEvent) -> usize {
        let cadence = self.cadence;
        let due = match self.active.as_mut() {
            Some(active) if active.lease == event.lease => {
                if cadence.is_zero() {
                    1
                } else {
                    let accumulated = active.accumulated.saturating_add(event.elapsed);
                    let whole = accumulated.as_nanos() / cadence.as_nanos();
                    let remainder = accumulated.as_nanos() % cadence.as_nanos();
                    active.accumulated = duration_from_nanos(remainder);
                    let remaining = active.route.len().saturating_sub(active.current + 1);
                    usize::try_from(whole).map_or(remaining, |due| due.min(remaining))
                }
            }
            Some(_) => {
                log::trace!("ignoring tick from stale lease {}", event.lease.generation);
                return 0;
            }
            None => return 0,
        };
        (0..due).take_while(|_| self.advance()).count()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn lease(&self) -> Option<TickLease> {
        self.active.as_ref().map(|active| active.lease)
    }

    #[must_use]
    pub fn route(&self) -> Option<&NormalizedRoute> {
        self.active.as_ref().map(|active| &active.route)
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.current)
    }

    #[must_use]
    pub fn current_step(&self) -> Option<&RouteStep> {
        self.active
            .as_ref()
            .and_then(|active| active.route.step(active.current))
    }

    #[must_use]
    pub fn next_step(&self) -> Option<&RouteStep> {
        self.active
            .as_ref()
            .and_then(|active| active.route.step(active.current + 1))
    }

    #[must_use]
    pub fn is_at_last_step(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.current + 1 >= active.route.len())
    }

    /// `0.0` while inactive or on a single-step route.
    #[must_use]
    pub fn percent_complete(&self) -> f64 {
        match self.active.as_ref() {
            Some(active) if active.route.len() > 1 => {
                active.current as f64 / (active.route.len() - 1) as f64 * 100.0
            }
            _ => 0.0,
        }
    }

    /// Steps after the current one.
    #[must_use]
    pub fn remaining_steps(&self) -> &[RouteStep] {
        self.active
            .as_ref()
            .and_then(|active| active.route.steps().get(active.current + 1..))
            .unwrap_or(&[])
    }

    /// Steps before the current one.
    #[must_use]
    pub fn completed_steps(&self) -> &[RouteStep] {
        self.active
            .as_ref()
            .and_then(|active| active.route.steps().get(..active.current))
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_steps().len()
    }

    #[must_use]
    pub fn remaining_distance_label(&self) -> String {
        format_distance(sum_step_distances(self.remaining_steps()))
    }

    /// Advisory signal for the presentation layer; state is untouched.
    #[must_use]
    pub fn recenter(&self) -> &'static str {
        RECENTER_NOTICE
    }

    /// Stop navigating and go back to the route preview.
    pub fn end(&mut self) -> NavigationExit {
        self.discard();
        NavigationExit::ReturnToRoutePreview
    }

    /// Stop navigating and start the whole flow over.
    pub fn restart(&mut self) -> NavigationExit {
        self.discard();
        NavigationExit::RestartFromIntro
    }

    fn discard(&mut self) {
        if self.active.take().is_some() {
            log::debug!("navigation stopped");
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Inverse of `Duration::as_nanos`, saturating at `Duration::MAX`.
fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    let subsec = u32::try_from(nanos % NANOS_PER_SEC).unwrap_or(0);
    Duration::new(secs, subsec)
}
