// SPDX-License-Identifier: MIT

//! Queue scheduler - batch resumption of due suspensions
//!
//! Periodically invoked (a timer, a cron route, or the CLI loop) to claim
//! due pending queue items and replay them through the engine. Claiming
//! marks an item `processing` atomically, which is the sole concurrency
//! guard: a concurrent pass cannot double-process the same item. Items
//! that were never claimed stay `pending` and are retried on the next
//! pass.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use futures::future::join_all;

use super::clock::Clock;
use super::engine::Engine;
use super::execution::{QueueItem, QueueItemStatus, StepOutcome};
use crate::axon::error::AxonError;
use crate::axon::store::ExecutionStore;

/// Default batch limit per pass
const DEFAULT_BATCH_LIMIT: usize = 10;

enum ItemResult {
    Completed,
    Suspended,
    Failed,
}

/// Summary of one scheduler pass
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SchedulerReport {
    pub claimed: usize,
    pub completed: usize,
    /// Resumptions that suspended again (chained delays)
    pub suspended: usize,
    pub failed: usize,
}

pub struct QueueScheduler {
    store: Arc<dyn ExecutionStore>,
    engine: Arc<Engine>,
    clock: Arc<dyn Clock>,
    batch_limit: usize,
}

impl QueueScheduler {
    pub fn new(store: Arc<dyn ExecutionStore>, engine: Arc<Engine>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            engine,
            clock,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }

    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit;
        self
    }

    /// One pass: claim due work, resume each claimed item, record the
    /// outcomes. Claimed items belong to distinct executions, so they
    /// resume concurrently.
    pub async fn process_due(&self) -> Result<SchedulerReport, AxonError> {
        let now = self.clock.now();
        let claimed = self.store.claim_due_pending(self.batch_limit, now).await?;
        let mut report = SchedulerReport {
            claimed: claimed.len(),
            ..Default::default()
        };
        if claimed.is_empty() {
            return Ok(report);
        }
        log::info!("Scheduler claimed {} due item(s)", claimed.len());

        let results = join_all(claimed.into_iter().map(|item| self.process_item(item))).await;
        for result in results {
            match result {
                ItemResult::Completed => report.completed += 1,
                ItemResult::Suspended => report.suspended += 1,
                ItemResult::Failed => report.failed += 1,
            }
        }
        Ok(report)
    }

    /// Resume one claimed item and record its outcome on the queue.
    async fn process_item(&self, item: QueueItem) -> ItemResult {
        let (status, error, result) =
            match self.engine.resume(&item.execution_id, &item.step_id).await {
                Ok(StepOutcome::Completed) => {
                    (QueueItemStatus::Completed, None, ItemResult::Completed)
                }
                Ok(StepOutcome::Suspended { resume_at }) => {
                    // Chained delay: this item's job ("wake and re-enter")
                    // is done; the new suspension enqueued its own item
                    log::info!(
                        "Execution {} suspended again until {}",
                        item.execution_id,
                        resume_at
                    );
                    (QueueItemStatus::Completed, None, ItemResult::Suspended)
                }
                Ok(StepOutcome::Failed { reason }) => {
                    (QueueItemStatus::Failed, Some(reason), ItemResult::Failed)
                }
                Err(e) => {
                    // The engine couldn't even run the step (store or
                    // definition trouble); the error is kept on the item
                    log::error!("Resume of execution {} errored: {}", item.execution_id, e);
                    (QueueItemStatus::Failed, Some(e.to_string()), ItemResult::Failed)
                }
            };

        if let Err(e) = self.store.mark_queue_item(&item.id, status, error).await {
            log::error!("Failed to record outcome of queue item {}: {}", item.id, e);
            return ItemResult::Failed;
        }
        result
    }

    /// Drive `process_due` forever at a fixed interval. Transient store
    /// failures leave unclaimed items pending for the next pass.
    pub async fn run_loop(&self, interval: StdDuration) {
        loop {
            match self.process_due().await {
                Ok(report) if report.claimed > 0 => {
                    log::info!(
                        "Scheduler pass: {} claimed, {} completed, {} suspended, {} failed",
                        report.claimed,
                        report.completed,
                        report.suspended,
                        report.failed
                    );
                }
                Ok(_) => {}
                Err(e) => log::error!("Scheduler pass failed: {}", e),
            }
            tokio::time::sleep(interval).await;
        }
    }
}
