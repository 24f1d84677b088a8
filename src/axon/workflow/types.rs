//! Workflow definition types
//!
//! This module defines the raw, serializable shape of a workflow graph:
//! nodes, edges, and per-node configuration. Definitions are pure data;
//! validation lives in [`graph`](super::graph) and behavior in
//! [`nodes`](super::nodes).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A workflow definition as authored (or generated) upstream
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WorkflowDefinition {
    /// Stable identifier used to look the workflow up in the store
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Description of what the automation does
    #[serde(default)]
    pub description: String,
    /// Nodes in the graph
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Directed edges between nodes
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A node in the workflow graph
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Node {
    /// Unique identifier within the workflow
    pub id: String,
    /// Node type, selecting the handler that executes it
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Display label, not semantically used
    #[serde(default)]
    pub label: String,
    /// Type-specific configuration, validated at dispatch time
    #[serde(default = "default_config")]
    pub config: Value,
}

fn default_config() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A directed edge between two nodes
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Edge {
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Discriminator when the source node has more than one logical exit
    /// (condition branches, button ids, A/B variants). Absent means the
    /// default/only exit.
    #[serde(default, rename = "sourceHandle", alias = "source_handle")]
    pub source_handle: Option<String>,
}

/// Closed enumeration of node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Trigger,
    Action,
    Buttons,
    WaitInput,
    Wait,
    Condition,
    AbTest,
    Crm,
    Email,
    Sms,
    Http,
    Billing,
    Notification,
    AiAgent,
    Variable,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Action => "action",
            NodeKind::Buttons => "buttons",
            NodeKind::WaitInput => "wait_input",
            NodeKind::Wait => "wait",
            NodeKind::Condition => "condition",
            NodeKind::AbTest => "ab_test",
            NodeKind::Crm => "crm",
            NodeKind::Email => "email",
            NodeKind::Sms => "sms",
            NodeKind::Http => "http",
            NodeKind::Billing => "billing",
            NodeKind::Notification => "notification",
            NodeKind::AiAgent => "ai_agent",
            NodeKind::Variable => "variable",
        }
    }

    /// Whether this node type can pause an execution
    pub fn can_suspend(&self) -> bool {
        matches!(
            self,
            NodeKind::Wait | NodeKind::WaitInput | NodeKind::Buttons
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
