use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use pulse_registry::RegistryStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::engine::CollectorEngine;

/// Periodic driver of collection cycles.
pub struct PollingScheduler;

/// Stops the scheduler task when asked to.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollingScheduler {
    /// Starts polling every direct application once per `interval`, running
    /// at most `workers` cycles at a time. The first tick fires immediately.
    pub fn spawn(
        engine: Arc<CollectorEngine>,
        registry: Arc<RegistryStore>,
        interval: Duration,
        workers: usize,
    ) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let workers = workers.max(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = interval.as_secs_f64(), workers, "Polling scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        run_tick(&engine, &registry, workers).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Polling scheduler stopped");
        });

        SchedulerHandle { shutdown, task }
    }
}

async fn run_tick(engine: &CollectorEngine, registry: &RegistryStore, workers: usize) {
    let snapshot = match registry.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = %e, "Skipping collection tick, registry unavailable");
            return;
        }
    };
    engine.retain_registered();

    stream::iter(snapshot.direct.keys())
        .for_each_concurrent(workers, |name| async move {
            match engine.try_poll(name).await {
                Ok(Some(_)) => {}
                Ok(None) => debug!(application = %name, "Previous cycle still running"),
                Err(e) => warn!(application = %name, error = %e, "Collection cycle failed"),
            }
        })
        .await;
}

impl SchedulerHandle {
    /// Signals the loop to stop and waits for it. A tick already running
    /// finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Polling scheduler task failed");
        }
    }
}
