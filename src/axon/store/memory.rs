// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::ExecutionStore;
use crate::axon::error::AxonError;
use crate::axon::workflow::context::ExecutionContext;
use crate::axon::workflow::execution::{Execution, QueueItem, QueueItemStatus};
use crate::axon::workflow::types::WorkflowDefinition;

/// In-memory store for tests and single-process runs
#[derive(Default)]
pub struct InMemoryStore {
    definitions: RwLock<HashMap<String, WorkflowDefinition>>,
    executions: RwLock<HashMap<String, Execution>>,
    queue: RwLock<HashMap<String, QueueItem>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All queue items, for inspection in tests and the HTTP surface
    pub async fn queue_items(&self) -> Vec<QueueItem> {
        self.queue.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryStore {
    async fn put_definition(&self, definition: WorkflowDefinition) -> Result<(), AxonError> {
        let mut definitions = self.definitions.write().await;
        definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    async fn get_definition(&self, workflow_id: &str) -> Result<WorkflowDefinition, AxonError> {
        let definitions = self.definitions.read().await;
        definitions
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| AxonError::WorkflowNotFound(workflow_id.to_string()))
    }

    async fn create_execution(
        &self,
        workflow_id: &str,
        initial: ExecutionContext,
        now: DateTime<Utc>,
    ) -> Result<Execution, AxonError> {
        let execution = Execution::new(
            Uuid::new_v4().to_string(),
            workflow_id.to_string(),
            initial,
            now,
        );
        let mut executions = self.executions.write().await;
        executions.insert(execution.id.clone(), execution.clone());
        Ok(execution)
    }

    async fn load_execution(&self, id: &str) -> Result<Execution, AxonError> {
        let executions = self.executions.read().await;
        executions
            .get(id)
            .cloned()
            .ok_or_else(|| AxonError::ExecutionNotFound(id.to_string()))
    }

    async fn save_execution(&self, execution: &Execution) -> Result<(), AxonError> {
        let mut executions = self.executions.write().await;
        executions.insert(execution.id.clone(), execution.clone());
        Ok(())
    }

    async fn enqueue_resume(
        &self,
        execution_id: &str,
        step_id: &str,
        resume_at: DateTime<Utc>,
    ) -> Result<QueueItem, AxonError> {
        let mut queue = self.queue.write().await;

        // Invariant: one outstanding wake-up per execution. An item still
        // `processing` is the claim that is driving this very enqueue
        // (chained delay), so only a second `pending` is a conflict.
        let outstanding = queue.values().any(|item| {
            item.execution_id == execution_id && item.status == QueueItemStatus::Pending
        });
        if outstanding {
            return Err(AxonError::store(format!(
                "execution '{}' already has a pending resumption",
                execution_id
            )));
        }

        let item = QueueItem {
            id: Uuid::new_v4().to_string(),
            execution_id: execution_id.to_string(),
            step_id: step_id.to_string(),
            resume_at,
            status: QueueItemStatus::Pending,
            error: None,
        };
        queue.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn claim_due_pending(
        &self,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<QueueItem>, AxonError> {
        // Single write lock makes select-and-mark atomic
        let mut queue = self.queue.write().await;

        let mut due: Vec<String> = queue
            .values()
            .filter(|item| item.status == QueueItemStatus::Pending && item.resume_at <= now)
            .map(|item| item.id.clone())
            .collect();
        due.sort_by_key(|id| queue[id].resume_at);
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(item) = queue.get_mut(&id) {
                item.status = QueueItemStatus::Processing;
                claimed.push(item.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_queue_item(
        &self,
        id: &str,
        status: QueueItemStatus,
        error: Option<String>,
    ) -> Result<(), AxonError> {
        let mut queue = self.queue.write().await;
        let item = queue
            .get_mut(id)
            .ok_or_else(|| AxonError::QueueItemNotFound(id.to_string()))?;
        item.status = status;
        item.error = error;
        Ok(())
    }

    async fn find_pending(&self, execution_id: &str) -> Result<Option<QueueItem>, AxonError> {
        let queue = self.queue.read().await;
        Ok(queue
            .values()
            .find(|item| {
                item.execution_id == execution_id && item.status == QueueItemStatus::Pending
            })
            .cloned())
    }
}
