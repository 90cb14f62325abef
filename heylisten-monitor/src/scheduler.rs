//! Periodic cycle driver.

use crate::controller::MonitorController;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runs a cycle immediately and then once per interval.
pub struct Scheduler {
    controller: Arc<MonitorController>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(controller: Arc<MonitorController>, interval: Duration) -> Self {
        Self {
            controller,
            interval,
        }
    }

    /// Starts the loop on a tokio task.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let cycles = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&cycles);

        let task = tokio::spawn(async move {
            info!(
                "Monitoring started, checking every {} seconds",
                self.interval.as_secs()
            );
            loop {
                let report = self.controller.run_cycle().await;
                counter.fetch_add(1, Ordering::SeqCst);
                debug!("Cycle {} complete", report.cycle_id);

                if *stop_rx.borrow() {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Monitoring stopped");
        });

        SchedulerHandle {
            stop_tx,
            cycles,
            task,
        }
    }
}

/// Handle to a running [`Scheduler`].
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    cycles: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Number of cycles completed so far.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops future cycles and waits for the loop to exit. A cycle in
    /// progress runs to completion.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }
    }
}
