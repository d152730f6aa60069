use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

/// A periodic background job that can be stopped deterministically.
///
/// [`stop`](SweepTask::stop) waits for the loop to exit, so no sweep runs once it
/// returns. Dropping the task without stopping it aborts the loop instead.
pub struct SweepTask {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SweepTask {
    /// Runs `sweep` every `period`, starting one period from now.
    ///
    /// The loop ends on its own once `sweep` returns `false`.
    pub fn start<F>(runtime: &Handle, period: Duration, mut sweep: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let handle = runtime.spawn(async move {
            let Some(start) = Instant::now().checked_add(period) else {
                // No tick would ever come due; just wait to be stopped.
                warn!(?period, "Sweep period too large to schedule, not sweeping");
                let _ = stop_rx.await;
                return;
            };
            debug!(?period, "Sweep task started");
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    // Stop requests win over a tick that is due at the same time.
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if !sweep() {
                            debug!("Sweep target dropped");
                            break;
                        }
                    }
                }
            }
            debug!("Sweep task stopped");
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The loop may have ended already; nothing to signal then.
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("Sweep task failed: {}", e);
                }
            }
        }
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
