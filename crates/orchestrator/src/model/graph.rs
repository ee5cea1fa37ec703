//! Immutable process definition graphs.
//!
//! A graph is built once per definition id (see [`super::cache::GraphCache`])
//! and shared read-only across concurrent orchestrations. Outgoing flows
//! keep their declaration order so traversal stays deterministic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// Kind of a node in a process definition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Work requiring a person to act; carries assignee/candidate users.
    UserTask,
    StartEvent,
    EndEvent,
    Gateway,
    /// Any other element (service task, intermediate event, ...). Expanded
    /// during traversal but never collected.
    Other,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeKind::UserTask => "user_task",
            NodeKind::StartEvent => "start_event",
            NodeKind::EndEvent => "end_event",
            NodeKind::Gateway => "gateway",
            NodeKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// A node in the process definition graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: NodeKind,
    /// Pre-set assignee for user tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Users eligible to claim the task when no assignee is pre-set.
    #[serde(default)]
    pub candidate_users: Vec<String>,
    /// Form key for user tasks and start events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_key: Option<String>,
}

impl FlowNode {
    /// Display label: the name if present, the id otherwise.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A directed sequence flow between two nodes, optionally guarded by a
/// boolean condition expression over process variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceFlow {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Immutable process definition graph.
#[derive(Debug, Clone)]
pub struct ProcessDefinitionGraph {
    definition_id: String,
    nodes: Vec<FlowNode>,
    index: HashMap<String, usize>,
    flows: Vec<SequenceFlow>,
    /// Flow indices per source node, in declaration order.
    outgoing: HashMap<String, Vec<usize>>,
}

impl ProcessDefinitionGraph {
    /// Build a graph from nodes and flows, validating referential
    /// integrity. Node and flow order is preserved.
    pub fn new(
        definition_id: &str,
        nodes: Vec<FlowNode>,
        flows: Vec<SequenceFlow>,
    ) -> AppResult<Self> {
        if nodes.is_empty() {
            return Err(AppError::Validation(format!(
                "Process definition {} has no nodes",
                definition_id
            )));
        }

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(AppError::Validation(format!(
                    "Duplicate node id '{}' in definition {}",
                    node.id, definition_id
                )));
            }
        }

        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, flow) in flows.iter().enumerate() {
            if !index.contains_key(&flow.source) {
                return Err(AppError::Validation(format!(
                    "Flow '{}' references unknown source node '{}'",
                    flow.id, flow.source
                )));
            }
            if !index.contains_key(&flow.target) {
                return Err(AppError::Validation(format!(
                    "Flow '{}' references unknown target node '{}'",
                    flow.id, flow.target
                )));
            }
            outgoing.entry(flow.source.clone()).or_default().push(i);
        }

        Ok(Self {
            definition_id: definition_id.to_string(),
            nodes,
            index,
            flows,
            outgoing,
        })
    }

    pub fn definition_id(&self) -> &str {
        &self.definition_id
    }

    /// Look up a node by id.
    pub fn node(&self, node_id: &str) -> Option<&FlowNode> {
        self.index.get(node_id).map(|&i| &self.nodes[i])
    }

    /// Outgoing sequence flows of a node, in declaration order.
    pub fn outgoing(&self, node_id: &str) -> Vec<&SequenceFlow> {
        self.outgoing
            .get(node_id)
            .map(|indices| indices.iter().map(|&i| &self.flows[i]).collect())
            .unwrap_or_default()
    }

    /// The first start event in declaration order, if any.
    pub fn initial_node(&self) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.kind == NodeKind::StartEvent)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, kind: NodeKind) -> FlowNode {
        FlowNode {
            id: id.to_string(),
            name: None,
            kind,
            assignee: None,
            candidate_users: vec![],
            form_key: None,
        }
    }

    fn flow(id: &str, source: &str, target: &str) -> SequenceFlow {
        SequenceFlow {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            condition: None,
        }
    }

    #[test]
    fn test_build_and_lookup() {
        let graph = ProcessDefinitionGraph::new(
            "def-1",
            vec![
                node("start", NodeKind::StartEvent),
                node("review", NodeKind::UserTask),
                node("end", NodeKind::EndEvent),
            ],
            vec![flow("f1", "start", "review"), flow("f2", "review", "end")],
        )
        .unwrap();

        assert_eq!(graph.definition_id(), "def-1");
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.node("review").unwrap().kind, NodeKind::UserTask);
        assert!(graph.node("missing").is_none());
        assert_eq!(graph.initial_node().unwrap().id, "start");
    }

    #[test]
    fn test_outgoing_preserves_order() {
        let graph = ProcessDefinitionGraph::new(
            "def-1",
            vec![
                node("gw", NodeKind::Gateway),
                node("a", NodeKind::UserTask),
                node("b", NodeKind::UserTask),
            ],
            vec![flow("f1", "gw", "a"), flow("f2", "gw", "b")],
        )
        .unwrap();

        let targets: Vec<&str> = graph.outgoing("gw").iter().map(|f| f.target.as_str()).collect();
        assert_eq!(targets, vec!["a", "b"]);
        assert!(graph.outgoing("a").is_empty());
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let result = ProcessDefinitionGraph::new(
            "def-1",
            vec![node("a", NodeKind::UserTask), node("a", NodeKind::UserTask)],
            vec![],
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_dangling_flow_rejected() {
        let result = ProcessDefinitionGraph::new(
            "def-1",
            vec![node("a", NodeKind::UserTask)],
            vec![flow("f1", "a", "ghost")],
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
