// SPDX-License-Identifier: MIT

//! Validated workflow graphs
//!
//! [`ValidatedGraph::load`] checks a raw [`WorkflowDefinition`] against the
//! structural invariants the engine relies on: exactly one trigger, no
//! dangling edge endpoints, unique node ids, and every non-trigger node
//! reachable from the trigger. The engine never begins executing a graph
//! that failed validation.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use super::types::{Edge, Node, NodeKind, WorkflowDefinition};

/// Malformed-graph errors, detected before any execution
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// The definition has no nodes at all
    #[error("Workflow has no nodes")]
    EmptyGraph,

    /// No trigger node present
    #[error("Workflow has no trigger node")]
    MissingTrigger,

    /// More than one trigger node present
    #[error("Workflow has {0} trigger nodes, expected exactly one")]
    MultipleTriggers(usize),

    /// Two nodes share an id
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(String),

    /// An edge references a node id that does not exist
    #[error("Edge references unknown node: {0}")]
    DanglingEdge(String),

    /// A non-trigger node cannot be reached from the trigger
    #[error("Node '{0}' is not reachable from the trigger")]
    UnreachableNode(String),
}

/// A workflow definition that passed structural validation, indexed for
/// dispatch
#[derive(Debug, Clone)]
pub struct ValidatedGraph {
    definition: WorkflowDefinition,
    node_index: HashMap<String, usize>,
    outgoing: HashMap<String, Vec<usize>>,
    trigger_id: String,
}

impl ValidatedGraph {
    /// Validate a definition and build the dispatch indexes
    pub fn load(definition: WorkflowDefinition) -> Result<Self, ValidationError> {
        if definition.nodes.is_empty() {
            return Err(ValidationError::EmptyGraph);
        }

        let mut node_index: HashMap<String, usize> = HashMap::new();
        for (i, node) in definition.nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), i).is_some() {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }

        let triggers: Vec<&Node> = definition
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Trigger)
            .collect();
        let trigger_id = match triggers.len() {
            0 => return Err(ValidationError::MissingTrigger),
            1 => triggers[0].id.clone(),
            n => return Err(ValidationError::MultipleTriggers(n)),
        };

        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, edge) in definition.edges.iter().enumerate() {
            if !node_index.contains_key(&edge.source) {
                return Err(ValidationError::DanglingEdge(edge.source.clone()));
            }
            if !node_index.contains_key(&edge.target) {
                return Err(ValidationError::DanglingEdge(edge.target.clone()));
            }
            outgoing.entry(edge.source.clone()).or_default().push(i);
        }

        // BFS from the trigger; every non-trigger node must be visited
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(trigger_id.as_str());
        queue.push_back(trigger_id.as_str());
        while let Some(id) = queue.pop_front() {
            if let Some(edge_ids) = outgoing.get(id) {
                for &ei in edge_ids {
                    let target = definition.edges[ei].target.as_str();
                    if visited.insert(target) {
                        queue.push_back(target);
                    }
                }
            }
        }
        for node in &definition.nodes {
            if !visited.contains(node.id.as_str()) {
                return Err(ValidationError::UnreachableNode(node.id.clone()));
            }
        }

        Ok(Self {
            definition,
            node_index,
            outgoing,
            trigger_id,
        })
    }

    /// The workflow id
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// The unique trigger node
    pub fn trigger(&self) -> &Node {
        // Index built during load; the trigger always resolves
        &self.definition.nodes[self.node_index[&self.trigger_id]]
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.definition.nodes[i])
    }

    /// All edges leaving a node
    pub fn edges_from(&self, id: &str) -> Vec<&Edge> {
        self.outgoing
            .get(id)
            .map(|ids| ids.iter().map(|&i| &self.definition.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Resolve the outgoing edge for a handle.
    ///
    /// `Some(handle)` selects the edge whose `source_handle` matches;
    /// `None` selects the edge with no `source_handle`. A missing match is
    /// a valid end-of-branch, not an error.
    pub fn resolve_edge(&self, id: &str, handle: Option<&str>) -> Option<&Edge> {
        self.edges_from(id)
            .into_iter()
            .find(|e| e.source_handle.as_deref() == handle)
    }

    /// Whether the node has an outgoing edge labelled with this handle
    pub fn has_handle(&self, id: &str, handle: &str) -> bool {
        self.resolve_edge(id, Some(handle)).is_some()
    }

    /// The underlying definition
    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.to_string(),
            kind,
            label: String::new(),
            config: json!({}),
        }
    }

    fn edge(source: &str, target: &str, handle: Option<&str>) -> Edge {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            source_handle: handle.map(|s| s.to_string()),
        }
    }

    fn linear_def() -> WorkflowDefinition {
        WorkflowDefinition {
            id: "wf".to_string(),
            nodes: vec![
                node("start", NodeKind::Trigger),
                node("a", NodeKind::Action),
                node("b", NodeKind::Action),
            ],
            edges: vec![edge("start", "a", None), edge("a", "b", None)],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_graph_loads() {
        let graph = ValidatedGraph::load(linear_def()).unwrap();
        assert_eq!(graph.trigger().id, "start");
        assert_eq!(graph.node("a").unwrap().kind, NodeKind::Action);
        assert!(graph.node("zzz").is_none());
    }

    #[test]
    fn test_empty_graph_rejected() {
        let def = WorkflowDefinition::default();
        assert_eq!(
            ValidatedGraph::load(def).unwrap_err(),
            ValidationError::EmptyGraph
        );
    }

    #[test]
    fn test_missing_trigger_rejected() {
        let def = WorkflowDefinition {
            id: "wf".to_string(),
            nodes: vec![node("a", NodeKind::Action)],
            ..Default::default()
        };
        assert_eq!(
            ValidatedGraph::load(def).unwrap_err(),
            ValidationError::MissingTrigger
        );
    }

    #[test]
    fn test_multiple_triggers_rejected() {
        let def = WorkflowDefinition {
            id: "wf".to_string(),
            nodes: vec![node("t1", NodeKind::Trigger), node("t2", NodeKind::Trigger)],
            ..Default::default()
        };
        assert_eq!(
            ValidatedGraph::load(def).unwrap_err(),
            ValidationError::MultipleTriggers(2)
        );
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let def = WorkflowDefinition {
            id: "wf".to_string(),
            nodes: vec![node("start", NodeKind::Trigger), node("start", NodeKind::Action)],
            ..Default::default()
        };
        assert_eq!(
            ValidatedGraph::load(def).unwrap_err(),
            ValidationError::DuplicateNodeId("start".to_string())
        );
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let mut def = linear_def();
        def.edges.push(edge("b", "ghost", None));
        assert_eq!(
            ValidatedGraph::load(def).unwrap_err(),
            ValidationError::DanglingEdge("ghost".to_string())
        );
    }

    #[test]
    fn test_unreachable_node_rejected() {
        let mut def = linear_def();
        def.nodes.push(node("island", NodeKind::Action));
        assert_eq!(
            ValidatedGraph::load(def).unwrap_err(),
            ValidationError::UnreachableNode("island".to_string())
        );
    }

    #[test]
    fn test_resolve_edge_by_handle() {
        let def = WorkflowDefinition {
            id: "wf".to_string(),
            nodes: vec![
                node("start", NodeKind::Trigger),
                node("check", NodeKind::Condition),
                node("yes_path", NodeKind::Action),
                node("no_path", NodeKind::Action),
            ],
            edges: vec![
                edge("start", "check", None),
                edge("check", "yes_path", Some("yes")),
                edge("check", "no_path", Some("no")),
            ],
            ..Default::default()
        };
        let graph = ValidatedGraph::load(def).unwrap();

        assert_eq!(
            graph.resolve_edge("check", Some("yes")).unwrap().target,
            "yes_path"
        );
        assert_eq!(
            graph.resolve_edge("check", Some("no")).unwrap().target,
            "no_path"
        );
        // No default edge on a fully-handled node
        assert!(graph.resolve_edge("check", None).is_none());
        assert!(graph.has_handle("check", "yes"));
        assert!(!graph.has_handle("check", "timeout"));
    }

    #[test]
    fn test_unmatched_handle_is_end_of_branch() {
        let graph = ValidatedGraph::load(linear_def()).unwrap();
        assert!(graph.resolve_edge("b", None).is_none());
        assert!(graph.resolve_edge("a", Some("whatever")).is_none());
    }

    #[test]
    fn test_cycle_is_structurally_allowed() {
        // Cycles are a documented hazard, not a validation failure; the
        // engine's step limit bounds them at run time.
        let def = WorkflowDefinition {
            id: "wf".to_string(),
            nodes: vec![
                node("start", NodeKind::Trigger),
                node("a", NodeKind::Action),
                node("b", NodeKind::Action),
            ],
            edges: vec![
                edge("start", "a", None),
                edge("a", "b", None),
                edge("b", "a", None),
            ],
            ..Default::default()
        };
        assert!(ValidatedGraph::load(def).is_ok());
    }
}
