// SPDX-License-Identifier: MIT

//! Execution and queue records
//!
//! An [`Execution`] is one run of a workflow for one trigger event. A
//! [`QueueItem`] is a durable "wake me up" record created when an
//! execution suspends. The store is the system of record for both between
//! engine invocations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::ExecutionContext;

/// Lifecycle state of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Inside one dispatch-loop invocation
    Running,
    /// Suspended with exactly one outstanding QueueItem
    Waiting,
    /// Graph exhausted
    Completed,
    /// Terminal error; inspectable, not retried
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// One run of a workflow definition for one trigger event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    pub context: ExecutionContext,
    pub status: ExecutionStatus,
    /// Last node entered by the dispatch loop
    pub current_step: Option<String>,
    /// Error message for failed executions
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Execution {
    pub fn new(
        id: String,
        workflow_id: String,
        context: ExecutionContext,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            workflow_id,
            context,
            status: ExecutionStatus::Running,
            current_step: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle state of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    /// Waiting for its resume time
    Pending,
    /// Claimed by a scheduler pass
    Processing,
    /// Resumption ran (including "suspended again")
    Completed,
    /// Resumption errored; error message retained
    Failed,
}

/// A durable pending-resumption record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub execution_id: String,
    /// Node to resume from
    pub step_id: String,
    pub resume_at: DateTime<Utc>,
    pub status: QueueItemStatus,
    pub error: Option<String>,
}

/// What one engine invocation (start or resume) reported.
///
/// `Suspended` is a clean control outcome, distinct from failure, so the
/// scheduler records "suspended again" rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Graph exhausted; execution completed
    Completed,
    /// Execution suspended (again); a new QueueItem exists
    Suspended { resume_at: DateTime<Utc> },
    /// Execution failed terminally
    Failed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_execution_is_running() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let exec = Execution::new(
            "e1".to_string(),
            "wf".to_string(),
            ExecutionContext::new(),
            now,
        );
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert!(exec.current_step.is_none());
        assert!(exec.error.is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Waiting.is_terminal());
    }

    #[test]
    fn test_status_serde_spelling() {
        assert_eq!(
            serde_json::to_value(ExecutionStatus::Waiting).unwrap(),
            serde_json::json!("waiting")
        );
        assert_eq!(
            serde_json::to_value(QueueItemStatus::Processing).unwrap(),
            serde_json::json!("processing")
        );
    }

    #[test]
    fn test_execution_serde_roundtrip() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut exec = Execution::new(
            "e1".to_string(),
            "wf".to_string(),
            ExecutionContext::new(),
            now,
        );
        exec.status = ExecutionStatus::Waiting;
        exec.current_step = Some("wait_1".to_string());

        let serialized = serde_json::to_string(&exec).unwrap();
        let restored: Execution = serde_json::from_str(&serialized).unwrap();
        assert_eq!(restored.status, ExecutionStatus::Waiting);
        assert_eq!(restored.current_step.as_deref(), Some("wait_1"));
    }
}
