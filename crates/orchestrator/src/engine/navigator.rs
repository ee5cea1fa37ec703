//! Next user-task discovery over the process definition graph.

use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::engine::evaluator::ConditionEvaluator;
use crate::error::{AppError, AppResult};
use crate::model::{FlowNode, NodeKind, ProcessDefinitionGraph, VariableSet};

/// Computes the user-task nodes reachable from a source node.
///
/// Traversal is breadth-first over outgoing sequence flows. Conditioned
/// flows are evaluated against the variable set; a false condition prunes
/// the branch. Non-user-task nodes (gateways, intermediate elements) are
/// expanded further; user-task nodes are collected and not expanded; end
/// events discard the branch. Already-visited nodes are not re-entered,
/// so cyclic graphs terminate. Output order is traversal order, which is
/// deterministic for a fixed graph and variable set.
pub struct ProcessGraphNavigator {
    evaluator: ConditionEvaluator,
}

impl Default for ProcessGraphNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessGraphNavigator {
    pub fn new() -> Self {
        Self {
            evaluator: ConditionEvaluator::new(),
        }
    }

    /// Find the next user-task nodes reachable from `source_node_id`.
    ///
    /// The source node must exist in the graph; an unknown id is a
    /// [`AppError::Graph`] lookup failure.
    pub fn next_user_task_nodes(
        &self,
        graph: &ProcessDefinitionGraph,
        source_node_id: &str,
        variables: &VariableSet,
    ) -> AppResult<Vec<FlowNode>> {
        if graph.node(source_node_id).is_none() {
            return Err(AppError::Graph(format!(
                "Node '{}' not found in definition {}",
                source_node_id,
                graph.definition_id()
            )));
        }

        let mut queue: VecDeque<String> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut found: Vec<FlowNode> = Vec::new();

        queue.push_back(source_node_id.to_string());
        visited.insert(source_node_id.to_string());

        while let Some(current) = queue.pop_front() {
            for edge in graph.outgoing(&current) {
                if !self.evaluator.flow_enabled(edge, variables)? {
                    continue;
                }

                // Cycle guard: a node already expanded or collected is
                // not entered again
                if !visited.insert(edge.target.clone()) {
                    continue;
                }

                // Target existence is validated at graph construction
                let target = match graph.node(&edge.target) {
                    Some(node) => node,
                    None => continue,
                };

                match target.kind {
                    NodeKind::UserTask => found.push(target.clone()),
                    NodeKind::EndEvent => {}
                    NodeKind::StartEvent | NodeKind::Gateway | NodeKind::Other => {
                        queue.push_back(target.id.clone());
                    }
                }
            }
        }

        debug!(
            definition_id = %graph.definition_id(),
            source = %source_node_id,
            next_tasks = found.len(),
            "Traversed process graph"
        );

        Ok(found)
    }
}
