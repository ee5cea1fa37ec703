//! Process model JSON parser.
//!
//! The engine exports a process definition as a flat JSON model of typed
//! nodes and sequence flows. This module parses that export into a
//! [`ProcessDefinitionGraph`] and validates it.

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::model::graph::{FlowNode, NodeKind, ProcessDefinitionGraph, SequenceFlow};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModel {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    flows: Vec<RawFlow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    candidate_users: Vec<String>,
    #[serde(default)]
    form_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFlow {
    #[serde(default)]
    id: Option<String>,
    source: String,
    target: String,
    #[serde(default)]
    condition: Option<String>,
}

/// Parse an engine-exported process model into a graph.
pub fn parse_process_model(
    definition_id: &str,
    model: &serde_json::Value,
) -> AppResult<ProcessDefinitionGraph> {
    let raw: RawModel = serde_json::from_value(model.clone())
        .map_err(|e| AppError::Parse(format!("Invalid process model JSON: {}", e)))?;

    let nodes: Vec<FlowNode> = raw
        .nodes
        .into_iter()
        .map(|n| FlowNode {
            kind: node_kind(&n.kind),
            id: n.id,
            name: n.name,
            assignee: n.assignee,
            candidate_users: n.candidate_users,
            form_key: n.form_key,
        })
        .collect();

    let flows: Vec<SequenceFlow> = raw
        .flows
        .into_iter()
        .map(|f| SequenceFlow {
            id: f
                .id
                .unwrap_or_else(|| format!("{}->{}", f.source, f.target)),
            source: f.source,
            target: f.target,
            // Blank conditions mean an unguarded flow
            condition: f.condition.filter(|c| !c.trim().is_empty()),
        })
        .collect();

    ProcessDefinitionGraph::new(definition_id, nodes, flows)
}

/// Map an engine element type to a node kind. Gateway variants
/// (exclusive, parallel, inclusive) all collapse to `Gateway`; anything
/// unrecognized is `Other` so traversal can still pass through it.
fn node_kind(raw: &str) -> NodeKind {
    match raw {
        "userTask" | "user_task" => NodeKind::UserTask,
        "startEvent" | "start_event" => NodeKind::StartEvent,
        "endEvent" | "end_event" => NodeKind::EndEvent,
        _ if raw.to_ascii_lowercase().contains("gateway") => NodeKind::Gateway,
        _ => NodeKind::Other,
    }
}
