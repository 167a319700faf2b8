use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::snapshot::store::{SnapshotError, SnapshotStore};
use crate::state::NumberSet;

const RUNNING: u8 = 0;
const STOPPED: u8 = 1;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WorkerError {
    #[error("snapshot worker is already stopped")]
    AlreadyStopped,
}

/// Background task persisting the number set on a fixed period.
///
/// Each tick copies the set out under its lock, sorts it ascending for
/// a deterministic on-disk ordering, and hands it to the store. The
/// lock is released before any file I/O starts. A failed save is
/// logged and retried on the next tick.
pub struct SnapshotWorker {
    numbers: Arc<NumberSet>,
    store: SnapshotStore,
    period: Duration,
    state: AtomicU8,
    stop: Notify,
    finished: Notify,
}

impl SnapshotWorker {
    pub fn new(numbers: Arc<NumberSet>, store: SnapshotStore, period: Duration) -> Self {
        Self {
            numbers,
            store,
            period,
            state: AtomicU8::new(RUNNING),
            stop: Notify::new(),
            finished: Notify::new(),
        }
    }

    /// Ticks until `shutdown` is called. An in-flight save always runs
    /// to completion before the loop observes the stop signal.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // interval fires immediately; skip that first tick
        ticker.tick().await;

        info!(period = ?self.period, path = %self.store.path().display(), "snapshot worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.persist().await {
                        warn!(error = %err, "snapshot failed, retrying on next tick");
                    }
                }
                _ = self.stop.notified() => break,
            }
        }

        info!("snapshot worker stopped");
        self.finished.notify_one();
    }

    async fn persist(&self) -> Result<(), SnapshotError> {
        let mut numbers = self.numbers.snapshot().await;
        numbers.sort_unstable();
        self.store.save(&numbers).await?;
        debug!(count = numbers.len(), "snapshot persisted");
        Ok(())
    }

    /// Stops the periodic tick and waits for any in-flight save to
    /// finish. A second call fails with `AlreadyStopped`.
    pub async fn shutdown(&self) -> Result<(), WorkerError> {
        if self
            .state
            .compare_exchange(RUNNING, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::AlreadyStopped);
        }

        self.stop.notify_one();
        self.finished.notified().await;
        Ok(())
    }
}
