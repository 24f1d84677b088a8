// SPDX-License-Identifier: MIT

//! Node dispatch
//!
//! Maps a node's declared type to its handler. A handler consumes the
//! node's rendered config and the execution context and produces an
//! [`Outcome`]: continue along an edge, suspend with a wake time, or fail
//! terminally. Handlers never touch durable storage; the engine's outer
//! loop owns all persistence.

mod actions;
mod config;
mod control;

pub use config::{
    AbTestConfig, AbVariant, ButtonChoice, ButtonsConfig, ConditionConfig, MathOp, OutputConfig,
    TimeoutAction, VariableConfig, VariableOp, WaitConfig, WaitInputConfig, WaitUnit,
};
pub use control::pick_variant;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::clock::Clock;
use super::context::ExecutionContext;
use super::graph::ValidatedGraph;
use super::types::{Node, NodeKind};
use crate::axon::capability::CapabilityRegistry;

/// Result of dispatching one node
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Proceed along the edge matching the handle (default edge if none)
    Continue(Option<String>),
    /// Pause; the engine persists state and a wake-up, then stops
    Suspend { resume_at: DateTime<Utc> },
    /// Terminal error for this execution
    Fail(String),
}

impl Outcome {
    /// Continue along the default edge
    pub fn next() -> Self {
        Outcome::Continue(None)
    }

    /// Continue along a named exit
    pub fn branch(handle: impl Into<String>) -> Self {
        Outcome::Continue(Some(handle.into()))
    }
}

/// How the dispatch loop entered this node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryMode {
    /// Normal edge traversal
    Fresh,
    /// First node of a resume invocation; suspending nodes evaluate
    /// their wake instead of suspending again
    Resume,
}

/// The context variable a waiting node captures external input into,
/// if the node waits for input at all
pub fn capture_key(node: &Node) -> Option<String> {
    match node.kind {
        NodeKind::WaitInput => {
            Some(config::parse_lenient::<WaitInputConfig>(&node.id, &node.config).output)
        }
        NodeKind::Buttons => {
            Some(config::parse_lenient::<ButtonsConfig>(&node.id, &node.config).output)
        }
        _ => None,
    }
}

/// Execute one node and report its outcome.
///
/// `rendered` is the node config with all `{{...}}` templates already
/// substituted against the context.
pub async fn dispatch(
    node: &Node,
    rendered: &Value,
    graph: &ValidatedGraph,
    context: &mut ExecutionContext,
    capabilities: &CapabilityRegistry,
    clock: &dyn Clock,
    entry: EntryMode,
) -> Outcome {
    match node.kind {
        // Entry point only; never itself dispatched during resume
        NodeKind::Trigger => Outcome::next(),
        NodeKind::Condition => control::condition(node, rendered, context),
        NodeKind::AbTest => control::ab_test(node, rendered),
        NodeKind::Wait => control::wait(node, rendered, clock, entry),
        NodeKind::WaitInput => control::wait_input(node, rendered, graph, context, clock, entry),
        NodeKind::Buttons => {
            control::buttons(node, rendered, context, capabilities, clock, entry).await
        }
        NodeKind::Variable => actions::variable(node, rendered, context),
        NodeKind::Action
        | NodeKind::Crm
        | NodeKind::Email
        | NodeKind::Sms
        | NodeKind::Http
        | NodeKind::Billing
        | NodeKind::Notification
        | NodeKind::AiAgent => actions::invoke_capability(node, rendered, context, capabilities).await,
    }
}
