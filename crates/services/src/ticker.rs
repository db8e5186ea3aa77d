use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at, Instant};

use quiz_core::timer::RepeatingTask;

/// Repeating tokio task that sends one `()` per period.
///
/// The first tick arrives one full period after spawning.
#[derive(Debug)]
pub struct IntervalTicker {
    handle: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    /// Spawn the task on the current runtime and return it with the tick receiver.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(period: Duration) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        (
            Self {
                handle: Some(handle),
            },
            rx,
        )
    }
}

impl RepeatingTask for IntervalTicker {
    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("tick source cancelled");
        }
    }

    fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
