//! Periodic sync driver.
//!
//! Runs an optional startup cycle, then one cycle per tick, with a manual
//! trigger channel on the side. Every trigger funnels into the same
//! [`SyncEngine`], whose busy flag drops whatever overlaps.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::engine::SyncEngine;
use crate::source::HistorySource;
use crate::store::StateStore;
use crate::transport::RecordTransport;

/// Requests an immediate sync cycle on a running scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    trigger: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Ask the scheduler to run a cycle as soon as possible.
    ///
    /// At most one request is held; returns `false` when a trigger is
    /// already pending and this one was dropped.
    pub fn request_sync(&self) -> bool {
        self.trigger.try_send(()).is_ok()
    }
}

/// Owns the tick loop around a [`SyncEngine`].
pub struct SyncScheduler<S, T, P> {
    engine: Arc<SyncEngine<S, T, P>>,
    period: Duration,
    run_on_start: bool,
    trigger_tx: mpsc::Sender<()>,
    trigger_rx: mpsc::Receiver<()>,
}

impl<S: HistorySource, T: RecordTransport, P: StateStore> SyncScheduler<S, T, P> {
    pub fn new(engine: Arc<SyncEngine<S, T, P>>, period: Duration, run_on_start: bool) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        Self {
            engine,
            // tokio::time::interval panics on a zero period.
            period: period.max(Duration::from_millis(1)),
            run_on_start,
            trigger_tx,
            trigger_rx,
        }
    }

    /// Handle for requesting manual cycles; valid for the scheduler's
    /// whole life.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            trigger: self.trigger_tx.clone(),
        }
    }

    /// Drive cycles until `cancel` fires.
    ///
    /// Cycle errors are logged and the loop keeps ticking; nothing here
    /// terminates the process.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            "Sync scheduler started (period {}s)",
            self.period.as_secs()
        );

        if self.run_on_start {
            Self::execute(&self.engine).await;
        }

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The interval's first tick completes immediately; the startup
        // cycle above already covers it.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Sync scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    Self::execute(&self.engine).await;
                }
                Some(()) = self.trigger_rx.recv() => {
                    tracing::debug!("Manual sync requested");
                    Self::execute(&self.engine).await;
                }
            }
        }
    }

    async fn execute(engine: &SyncEngine<S, T, P>) {
        if let Err(error) = engine.run_cycle().await {
            tracing::error!("Sync cycle failed: {error}");
        }
    }
}
