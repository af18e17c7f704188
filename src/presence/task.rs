use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use super::PresenceTracker;

/// Background loop that sweeps stale participants every `period`.
///
/// The first sweep runs one period after `start`. Dropping the handle cancels
/// the loop; `stop` also waits for it to finish.
pub struct SweepTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SweepTask {
    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// Panics if `period` is zero.
    pub fn start(tracker: Arc<PresenceTracker>, period: Duration, threshold: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::info!(
                "Presence sweep started (period {:?}, threshold {:?})",
                period,
                threshold
            );

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => run_sweep(&tracker, threshold).await,
                }
            }

            log::info!("Presence sweep stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                log::warn!("Presence sweep task ended abnormally: {err}");
            }
        }
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// The pass holds the store lock for its whole run, so keep it off the
// runtime workers.
async fn run_sweep(tracker: &Arc<PresenceTracker>, threshold: Duration) {
    let tracker = Arc::clone(tracker);
    match tokio::task::spawn_blocking(move || tracker.sweep(Utc::now(), threshold)).await {
        Ok(Ok(report)) if !report.is_empty() => log::info!(
            "Sweep evicted {} participant(s), {} failure(s)",
            report.evicted.len(),
            report.failures.len()
        ),
        Ok(Ok(_)) => {}
        Ok(Err(err)) => log::error!("Sweep could not list participants: {err}"),
        Err(err) => log::error!("Sweep task panicked or was cancelled: {err}"),
    }
}
