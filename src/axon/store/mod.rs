// SPDX-License-Identifier: MIT

//! Durable persistence boundary
//!
//! The engine owns an execution only for the duration of one dispatch
//! loop; between steps, the [`ExecutionStore`] is the system of record.
//! A real deployment binds this to a database; the in-memory
//! implementation backs tests and single-process runs.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::axon::error::AxonError;
use crate::axon::workflow::context::ExecutionContext;
use crate::axon::workflow::execution::{Execution, QueueItem, QueueItemStatus};
use crate::axon::workflow::types::WorkflowDefinition;

/// Durable storage for definitions, executions, and the resumption queue
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Install or replace a workflow definition
    async fn put_definition(&self, definition: WorkflowDefinition) -> Result<(), AxonError>;

    /// Fetch a workflow definition by id
    async fn get_definition(&self, workflow_id: &str) -> Result<WorkflowDefinition, AxonError>;

    /// Create a new execution in `running` state
    async fn create_execution(
        &self,
        workflow_id: &str,
        initial: ExecutionContext,
        now: DateTime<Utc>,
    ) -> Result<Execution, AxonError>;

    /// Load an execution by id
    async fn load_execution(&self, id: &str) -> Result<Execution, AxonError>;

    /// Persist the full state of an execution
    async fn save_execution(&self, execution: &Execution) -> Result<(), AxonError>;

    /// Create the pending wake-up record for a suspension.
    ///
    /// A suspended execution has exactly one outstanding wake-up: a
    /// second `pending` enqueue for the same execution is a store error.
    /// (An item still `processing` does not conflict - it is the claim
    /// whose resumption is suspending again.)
    async fn enqueue_resume(
        &self,
        execution_id: &str,
        step_id: &str,
        resume_at: DateTime<Utc>,
    ) -> Result<QueueItem, AxonError>;

    /// Atomically claim up to `limit` due pending items, oldest first,
    /// marking each `processing` before returning it
    async fn claim_due_pending(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<QueueItem>, AxonError>;

    /// Record the outcome of a claimed item
    async fn mark_queue_item(
        &self,
        id: &str,
        status: QueueItemStatus,
        error: Option<String>,
    ) -> Result<(), AxonError>;

    /// The outstanding pending item for an execution, if any
    async fn find_pending(&self, execution_id: &str) -> Result<Option<QueueItem>, AxonError>;
}
