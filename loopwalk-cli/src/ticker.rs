use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use loopwalk_core::{TickEvent, TickLease};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Periodic navigation timer. The task is aborted when the guard drops, so
/// leaving the navigation loop by any path stops the ticks.
#[derive(Debug)]
pub struct TickerGuard {
    handle: JoinHandle<()>,
}

impl TickerGuard {
    /// Start ticking for `lease` every `cadence`.
    #[must_use]
    pub fn spawn(lease: TickLease, cadence: Duration) -> (Self, UnboundedReceiver<TickEvent>) {
        let (sender, receiver) = unbounded_channel();
        let period = cadence.max(MIN_PERIOD);
        let handle = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if sender.send(TickEvent::new(lease, cadence)).is_err() {
                    break;
                }
            }
        });
        (Self { handle }, receiver)
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.handle.abort();
        log::debug!("navigation ticker released");
    }
}
