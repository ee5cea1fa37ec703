//! Pending-notice fan-out for next user-task nodes.
//!
//! Shared by the completion and start orchestrators. Recipients across
//! all nodes are resolved in one batched identity lookup, then the
//! issuances are dispatched concurrently. Every issuance is independent:
//! one failure never blocks the others, and a recipient without a
//! directory entry is skipped with a warning.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::gateway::{NotificationGateway, NotificationTarget};
use crate::model::FlowNode;
use crate::ports::IdentityDirectory;
use crate::services::outcome::{OrchestrationWarning, WarningStage};

/// Recipients of a user-task node: its candidate users, or the assignee
/// when no candidates are configured. Duplicates are dropped, first
/// occurrence wins.
fn recipients(node: &FlowNode, warnings: &mut Vec<OrchestrationWarning>) -> Vec<String> {
    if !node.candidate_users.is_empty() {
        let mut seen = std::collections::HashSet::new();
        return node
            .candidate_users
            .iter()
            .filter(|id| seen.insert(id.to_string()))
            .cloned()
            .collect();
    }
    match &node.assignee {
        Some(assignee) => vec![assignee.clone()],
        None => {
            warn!(node = %node.id, "User task has neither assignee nor candidate users");
            warnings.push(OrchestrationWarning::new(
                WarningStage::Issue,
                format!(
                    "User task '{}' has neither assignee nor candidate users; no notice issued",
                    node.id
                ),
            ));
            vec![]
        }
    }
}

/// Issue one pending notice per recipient of each node. Returns the ids
/// of nodes for which at least one notice went out.
pub(crate) async fn issue_for_nodes(
    gateway: &dyn NotificationGateway,
    identity: &dyn IdentityDirectory,
    nodes: &[FlowNode],
    warnings: &mut Vec<OrchestrationWarning>,
) -> Vec<String> {
    // (node id, recipient) pairs in traversal order
    let mut pending: Vec<(String, String)> = Vec::new();
    for node in nodes {
        for user_id in recipients(node, warnings) {
            pending.push((node.id.clone(), user_id));
        }
    }

    if pending.is_empty() {
        return vec![];
    }

    let mut user_ids: Vec<String> = pending.iter().map(|(_, u)| u.clone()).collect();
    user_ids.sort();
    user_ids.dedup();

    let users = match identity.users_by_ids(&user_ids).await {
        Ok(users) => users,
        Err(e) => {
            warn!(error = %e, "Identity lookup failed; no notices issued");
            warnings.push(OrchestrationWarning::new(
                WarningStage::Issue,
                format!("Identity lookup failed; no notices issued: {}", e),
            ));
            return vec![];
        }
    };

    let mut targets: Vec<NotificationTarget> = Vec::with_capacity(pending.len());
    for (node_id, user_id) in &pending {
        match users.get(user_id) {
            Some(user) => {
                targets.push(NotificationTarget::new(node_id, user_id, &user.display_name()))
            }
            None => {
                warn!(node = %node_id, user = %user_id, "Unknown user; notice skipped");
                warnings.push(OrchestrationWarning::new(
                    WarningStage::Issue,
                    format!("Unknown user '{}'; notice for node '{}' skipped", user_id, node_id),
                ));
            }
        }
    }

    let results = join_all(targets.iter().map(|t| gateway.issue(t))).await;

    let mut notified: Vec<String> = Vec::new();
    for (target, result) in targets.iter().zip(results) {
        match result {
            Ok(()) => {
                debug!(node = %target.item_id, user = %target.user_id, "Pending notice issued");
                if !notified.contains(&target.item_id) {
                    notified.push(target.item_id.clone());
                }
            }
            Err(e) => {
                warn!(node = %target.item_id, user = %target.user_id, error = %e, "Issuance failed");
                warnings.push(OrchestrationWarning::new(
                    WarningStage::Issue,
                    format!(
                        "Notice for user '{}' on node '{}' failed: {}",
                        target.user_id, target.item_id, e
                    ),
                ));
            }
        }
    }

    notified
}
