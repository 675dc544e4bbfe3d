//! Periodic reconciliation trigger.

use crate::remote::RemoteStore;
use crate::state::{SyncEngine, SyncOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Background task calling [`SyncEngine::try_reconcile`] on a fixed period.
///
/// Must be spawned from within a tokio runtime. Each run executes on the
/// blocking pool.
pub struct SyncScheduler {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl SyncScheduler {
    /// Starts the scheduler. The first run happens one period from now.
    pub fn spawn<R>(engine: Arc<SyncEngine<R>>, period: Duration) -> Self
    where
        R: RemoteStore + 'static,
    {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_secs = period.as_secs(), "sync scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let engine = engine.clone();
                        match tokio::task::spawn_blocking(move || engine.try_reconcile()).await {
                            Ok(Ok(SyncOutcome::Completed(report))) => {
                                debug!(?report, "scheduled sync completed");
                            }
                            Ok(Ok(SyncOutcome::Skipped(reason))) => {
                                debug!(%reason, "scheduled sync skipped");
                            }
                            Ok(Err(e)) if e.is_retryable() => {
                                warn!(error = %e, "scheduled sync failed, retrying next period");
                            }
                            Ok(Err(e)) => error!(error = %e, "scheduled sync failed"),
                            Err(e) => error!(error = %e, "scheduled sync task panicked"),
                        }
                    }
                    _ = signal.notified() => break,
                }
            }
            info!("sync scheduler stopped");
        });

        Self { shutdown, handle }
    }

    /// Stops the scheduler and waits for the current run to finish.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            error!(error = %e, "sync scheduler task failed");
        }
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
