use crate::batch::{Batch, BatchStatus, TransitionError};
use crate::config::DispatcherConfig;
use crate::dispatch::work_unit::{WorkError, WorkUnit};
use crate::queue::SharedQueue;
use crate::storage::{Ledger, StorageError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("ledger error: {0}")]
    Storage(#[from] StorageError),

    #[error("status transition error: {0}")]
    Transition(#[from] TransitionError),
}

/// Timing knobs for the dispatch loop
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub rate_limit: Duration,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self::from(&DispatcherConfig::default())
    }
}

impl From<&DispatcherConfig> for DispatcherSettings {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            rate_limit: config.rate_limit,
            poll_interval: config.poll_interval,
            error_backoff: config.error_backoff,
        }
    }
}

/// Counters published by the loop for the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatcherStats {
    pub in_flight: Option<Uuid>,
    pub batches_completed: u64,
    pub batches_abandoned: u64,
    pub items_processed: u64,
    pub last_dispatch_end: Option<DateTime<Utc>>,
}

pub type SharedStats = Arc<RwLock<DispatcherStats>>;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing queued
    Idle,

    /// Work is queued but the previous dispatch ended too recently
    RateLimited { remaining: Duration },

    Completed { batch_id: Uuid },

    /// A work-unit call failed; the batch stays `triggered`
    Abandoned { batch_id: Uuid, failed_id: u64 },
}

enum BatchOutcome {
    Completed,
    Abandoned { failed_id: u64, error: WorkError },
}

/// Single-flight dispatcher: pulls one batch at a time from the queue and
/// drives it through the work unit, no sooner than `rate_limit` after the
/// previous batch finished.
///
/// Only this type writes batch status after submission.
pub struct Dispatcher {
    queue: SharedQueue,
    ledger: Arc<dyn Ledger>,
    work_unit: Arc<dyn WorkUnit>,
    settings: DispatcherSettings,
    last_dispatch_end: Option<Instant>,
    stats: SharedStats,
}

impl Dispatcher {
    pub fn new(
        queue: SharedQueue,
        ledger: Arc<dyn Ledger>,
        work_unit: Arc<dyn WorkUnit>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            queue,
            ledger,
            work_unit,
            settings,
            last_dispatch_end: None,
            stats: Arc::new(RwLock::new(DispatcherStats::default())),
        }
    }

    pub fn stats(&self) -> SharedStats {
        Arc::clone(&self.stats)
    }

    /// Time left before the next dispatch may start, or `None` if it may start now.
    fn rate_limit_remaining(&self) -> Option<Duration> {
        let elapsed = self.last_dispatch_end?.elapsed();
        (elapsed < self.settings.rate_limit).then(|| self.settings.rate_limit - elapsed)
    }

    /// Evaluate one tick: dispatch the next batch if the queue has one and the
    /// rate limit allows, otherwise report why not.
    pub async fn tick(&mut self) -> Result<TickOutcome, DispatchError> {
        let batch = {
            let mut queue = self.queue.lock().await;
            if queue.is_empty() {
                return Ok(TickOutcome::Idle);
            }
            if let Some(remaining) = self.rate_limit_remaining() {
                return Ok(TickOutcome::RateLimited { remaining });
            }
            match queue.dequeue() {
                Some(batch) => batch,
                None => return Ok(TickOutcome::Idle),
            }
        };

        let batch_id = batch.batch_id;
        let result = self.dispatch(batch).await;

        // The rate limit counts from here, whether the batch finished or not
        self.last_dispatch_end = Some(Instant::now());
        {
            let mut stats = self.stats.write().await;
            stats.in_flight = None;
            stats.last_dispatch_end = Some(Utc::now());
            match &result {
                Ok(BatchOutcome::Completed) => stats.batches_completed += 1,
                Ok(BatchOutcome::Abandoned { .. }) => stats.batches_abandoned += 1,
                Err(_) => {}
            }
        }

        match result? {
            BatchOutcome::Completed => Ok(TickOutcome::Completed { batch_id }),
            BatchOutcome::Abandoned { failed_id, error } => {
                error!(
                    batch_id = %batch_id,
                    failed_id = failed_id,
                    error = %error,
                    "Batch abandoned after work unit failure"
                );
                Ok(TickOutcome::Abandoned {
                    batch_id,
                    failed_id,
                })
            }
        }
    }

    async fn dispatch(&self, mut batch: Batch) -> Result<BatchOutcome, DispatchError> {
        info!(
            batch_id = %batch.batch_id,
            ingestion_id = %batch.ingestion_id,
            priority = %batch.priority,
            ids = ?batch.ids,
            "Processing batch"
        );

        batch.advance(BatchStatus::Triggered)?;
        self.stats.write().await.in_flight = Some(batch.batch_id);
        self.record_status(&batch).await?;

        for &id in &batch.ids {
            match self.work_unit.process(id).await {
                Ok(output) => {
                    debug!(batch_id = %batch.batch_id, id = output.id, "Processed id");
                    self.stats.write().await.items_processed += 1;
                }
                Err(error) => return Ok(BatchOutcome::Abandoned { failed_id: id, error }),
            }
        }

        batch.advance(BatchStatus::Completed)?;
        self.record_status(&batch).await?;

        info!(batch_id = %batch.batch_id, "Completed batch");
        Ok(BatchOutcome::Completed)
    }

    async fn record_status(&self, batch: &Batch) -> Result<(), DispatchError> {
        let found = self
            .ledger
            .update_batch_status(batch.ingestion_id, batch.batch_id, batch.status)
            .await?;
        if !found {
            warn!(
                batch_id = %batch.batch_id,
                status = %batch.status,
                "Status update did not match a ledger record"
            );
        }
        Ok(())
    }

    /// Run until `shutdown` flips to true (or its sender is dropped).
    ///
    /// Errors from a tick are logged and followed by `error_backoff`; they
    /// never end the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            rate_limit = ?self.settings.rate_limit,
            poll_interval = ?self.settings.poll_interval,
            "Dispatcher started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.tick().await {
                Ok(_) => self.settings.poll_interval,
                Err(e) => {
                    error!(error = %e, "Error in dispatch loop");
                    self.settings.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Dispatcher stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
