//! Periodic escalation-log purge with an explicit start/stop lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::escalation::ErrorEscalator;

/// Handle for the background purge task. Dropping it without calling
/// [`MaintenanceHandle::stop`] leaves the task running until process exit,
/// which matches the process-lifetime contract of the escalation state.
#[derive(Debug)]
pub struct MaintenanceHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Signals the loop to exit and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawns the purge loop at the given cadence (default config: hourly).
pub fn spawn_purge_loop(
    escalator: Arc<ErrorEscalator>,
    interval: Duration,
) -> MaintenanceHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; harmless for a purge.
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    escalator.purge_old();
                    debug!(
                        log_len = escalator.log_len(),
                        tracked_identities = escalator.tracked_identities(),
                        "escalation purge ran"
                    );
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });
    MaintenanceHandle { shutdown, task }
}
