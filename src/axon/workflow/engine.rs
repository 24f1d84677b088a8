// SPDX-License-Identifier: MIT

//! The workflow engine
//!
//! [`Engine`] owns the dispatch loop: walk the graph node by node,
//! rendering config against the context and executing handlers, until the
//! graph is exhausted (completed), a handler fails (failed), or a handler
//! suspends (waiting). On suspension the engine persists the execution
//! and exactly one pending [`QueueItem`](super::execution::QueueItem),
//! then returns; the scheduler
//! later calls [`Engine::resume`] at the saved step. State is reloaded
//! fresh from the store on every resume, so a process restart between
//! suspend and resume is transparent.

use std::sync::Arc;

use serde_json::Value;

use super::clock::Clock;
use super::context::ExecutionContext;
use super::execution::{Execution, ExecutionStatus, QueueItemStatus, StepOutcome};
use super::graph::ValidatedGraph;
use super::nodes::{self, EntryMode, Outcome};
use super::template;
use crate::axon::capability::CapabilityRegistry;
use crate::axon::error::AxonError;
use crate::axon::store::ExecutionStore;

/// Default bound on nodes dispatched in one invocation; a cyclic graph
/// hits this instead of hanging
const DEFAULT_MAX_STEPS: usize = 1000;

pub struct Engine {
    store: Arc<dyn ExecutionStore>,
    capabilities: CapabilityRegistry,
    clock: Arc<dyn Clock>,
    max_steps: usize,
}

impl Engine {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        capabilities: CapabilityRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            capabilities,
            clock,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Start a new execution for a trigger event.
    ///
    /// Validates the graph, creates the execution record, and drives the
    /// dispatch loop from the trigger. Returns the new execution id with
    /// the outcome of this first step-chain.
    pub async fn start(
        &self,
        workflow_id: &str,
        initial: ExecutionContext,
    ) -> Result<(String, StepOutcome), AxonError> {
        let definition = self.store.get_definition(workflow_id).await?;
        let graph = ValidatedGraph::load(definition)?;

        let execution = self
            .store
            .create_execution(workflow_id, initial, self.clock.now())
            .await?;
        let execution_id = execution.id.clone();
        log::info!("Starting execution {} of workflow {}", execution_id, workflow_id);

        let trigger_id = graph.trigger().id.clone();
        let outcome = self
            .run_from(&graph, execution, &trigger_id, EntryMode::Fresh)
            .await?;
        Ok((execution_id, outcome))
    }

    /// Resume a waiting execution at a saved step.
    ///
    /// Reloads the definition and context fresh from the store and
    /// re-enters the dispatch loop at `step_id` without replaying earlier
    /// nodes. Resuming an execution that already reached a terminal state
    /// is a no-op reporting that state.
    pub async fn resume(
        &self,
        execution_id: &str,
        step_id: &str,
    ) -> Result<StepOutcome, AxonError> {
        let mut execution = self.store.load_execution(execution_id).await?;

        match execution.status {
            ExecutionStatus::Waiting => {}
            ExecutionStatus::Completed => {
                log::warn!("Resume of already-completed execution {}", execution_id);
                return Ok(StepOutcome::Completed);
            }
            ExecutionStatus::Failed => {
                log::warn!("Resume of already-failed execution {}", execution_id);
                return Ok(StepOutcome::Failed {
                    reason: execution.error.unwrap_or_else(|| "failed".to_string()),
                });
            }
            ExecutionStatus::Running => {
                return Err(AxonError::store(format!(
                    "execution '{}' is already running",
                    execution_id
                )));
            }
        }

        let definition = self.store.get_definition(&execution.workflow_id).await?;
        let graph = ValidatedGraph::load(definition)?;
        if graph.node(step_id).is_none() {
            // The definition changed underneath a suspended run
            let reason = format!("resume step '{}' no longer exists", step_id);
            execution.status = ExecutionStatus::Failed;
            execution.error = Some(reason.clone());
            execution.updated_at = self.clock.now();
            self.store.save_execution(&execution).await?;
            return Ok(StepOutcome::Failed { reason });
        }

        log::info!("Resuming execution {} at step {}", execution_id, step_id);
        execution.status = ExecutionStatus::Running;
        self.run_from(&graph, execution, step_id, EntryMode::Resume).await
    }

    /// Hand a user reply to an execution waiting at a `wait_input` or
    /// `buttons` node, ahead of its timeout.
    ///
    /// Stores the reply under the node's configured output variable,
    /// closes the outstanding QueueItem, and resumes at the waiting node.
    pub async fn deliver_reply(
        &self,
        execution_id: &str,
        reply: Value,
    ) -> Result<StepOutcome, AxonError> {
        let mut execution = self.store.load_execution(execution_id).await?;
        if execution.status != ExecutionStatus::Waiting {
            return Err(AxonError::store(format!(
                "execution '{}' is not waiting for input",
                execution_id
            )));
        }
        let step_id = execution.current_step.clone().ok_or_else(|| {
            AxonError::store(format!("execution '{}' has no current step", execution_id))
        })?;

        let definition = self.store.get_definition(&execution.workflow_id).await?;
        let graph = ValidatedGraph::load(definition)?;
        let node = graph
            .node(&step_id)
            .ok_or_else(|| AxonError::store(format!("step '{}' no longer exists", step_id)))?;

        let output = nodes::capture_key(node).ok_or_else(|| {
            AxonError::store(format!(
                "step '{}' ({}) does not accept replies",
                step_id, node.kind
            ))
        })?;

        let pending = self.store.find_pending(execution_id).await?.ok_or_else(|| {
            AxonError::store(format!(
                "execution '{}' has no pending resumption",
                execution_id
            ))
        })?;

        execution.context.set(output, reply);
        execution.updated_at = self.clock.now();
        self.store.save_execution(&execution).await?;
        // The timer's job is preempted by the reply
        self.store
            .mark_queue_item(&pending.id, QueueItemStatus::Completed, None)
            .await?;

        self.resume(execution_id, &step_id).await
    }

    /// Cancel a waiting execution: `waiting -> failed` with reason
    /// `cancelled`, closing the outstanding QueueItem so no orphaned
    /// timer remains.
    pub async fn cancel(
        &self,
        execution_id: &str,
        reason: Option<String>,
    ) -> Result<(), AxonError> {
        let mut execution = self.store.load_execution(execution_id).await?;
        if execution.status != ExecutionStatus::Waiting {
            return Err(AxonError::store(format!(
                "execution '{}' is not waiting, cannot cancel",
                execution_id
            )));
        }

        let reason = reason.unwrap_or_else(|| "cancelled".to_string());
        execution.status = ExecutionStatus::Failed;
        execution.error = Some(reason.clone());
        execution.updated_at = self.clock.now();
        self.store.save_execution(&execution).await?;

        if let Some(pending) = self.store.find_pending(execution_id).await? {
            self.store
                .mark_queue_item(&pending.id, QueueItemStatus::Failed, Some(reason))
                .await?;
        }
        log::info!("Cancelled execution {}", execution_id);
        Ok(())
    }

    /// The dispatch loop: walk from `entry_step` until the graph is
    /// exhausted, a handler suspends, or a handler fails. Terminal and
    /// suspension states persist exactly once, here.
    async fn run_from(
        &self,
        graph: &ValidatedGraph,
        mut execution: Execution,
        entry_step: &str,
        mode: EntryMode,
    ) -> Result<StepOutcome, AxonError> {
        let mut current = match graph.node(entry_step) {
            Some(node) => node,
            None => {
                return Err(AxonError::store(format!(
                    "entry step '{}' not in graph",
                    entry_step
                )))
            }
        };
        let mut entry = mode;
        let mut steps = 0;

        loop {
            steps += 1;
            if steps > self.max_steps {
                let reason = format!(
                    "step limit ({}) exceeded at node '{}'; graph cycle?",
                    self.max_steps, current.id
                );
                log::error!("Execution {}: {}", execution.id, reason);
                return self.finish_failed(execution, reason).await;
            }

            execution.current_step = Some(current.id.clone());
            let rendered = template::render_config(&current.config, &execution.context);

            log::debug!(
                "Execution {}: dispatching {} ({})",
                execution.id,
                current.id,
                current.kind
            );
            let outcome = nodes::dispatch(
                current,
                &rendered,
                graph,
                &mut execution.context,
                &self.capabilities,
                self.clock.as_ref(),
                entry,
            )
            .await;
            entry = EntryMode::Fresh;

            match outcome {
                Outcome::Continue(handle) => {
                    match graph.resolve_edge(&current.id, handle.as_deref()) {
                        Some(edge) => {
                            current = graph.node(&edge.target).ok_or_else(|| {
                                // Unreachable after validation
                                AxonError::store(format!("edge target '{}' missing", edge.target))
                            })?;
                        }
                        None => {
                            // An unconnected exit is a valid end of branch
                            execution.status = ExecutionStatus::Completed;
                            execution.updated_at = self.clock.now();
                            self.store.save_execution(&execution).await?;
                            log::info!("Execution {} completed", execution.id);
                            return Ok(StepOutcome::Completed);
                        }
                    }
                }
                Outcome::Suspend { resume_at } => {
                    execution.status = ExecutionStatus::Waiting;
                    execution.updated_at = self.clock.now();
                    self.store.save_execution(&execution).await?;
                    self.store
                        .enqueue_resume(&execution.id, &current.id, resume_at)
                        .await?;
                    log::info!(
                        "Execution {} waiting at {} until {}",
                        execution.id,
                        current.id,
                        resume_at
                    );
                    return Ok(StepOutcome::Suspended { resume_at });
                }
                Outcome::Fail(reason) => {
                    log::warn!("Execution {} failed at {}: {}", execution.id, current.id, reason);
                    return self.finish_failed(execution, reason).await;
                }
            }
        }
    }

    async fn finish_failed(
        &self,
        mut execution: Execution,
        reason: String,
    ) -> Result<StepOutcome, AxonError> {
        execution.status = ExecutionStatus::Failed;
        execution.error = Some(reason.clone());
        execution.updated_at = self.clock.now();
        self.store.save_execution(&execution).await?;
        Ok(StepOutcome::Failed { reason })
    }
}
