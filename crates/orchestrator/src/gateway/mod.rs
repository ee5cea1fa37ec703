//! Notification gateway to the external to-do system.
//!
//! The to-do system keeps a pending-action record per (item, user). This
//! layer issues a record when a user task becomes actionable and retracts
//! the record when its task is completed. The gateway is not transactional
//! with the process engine: every call can fail on its own, and callers
//! collect those failures as warnings instead of propagating them.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpTodoGateway;

/// Errors from the to-do system boundary. Never surfaced to API callers
/// directly; orchestrators downgrade them to warnings.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("to-do transport error: {0}")]
    Transport(String),

    #[error("to-do endpoint rejected the call: {0}")]
    Rejected(String),

    #[error("to-do payload error: {0}")]
    Payload(String),
}

/// The unit issued to or retracted from the to-do system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    /// Node id for issuances; task id for retractions.
    pub item_id: String,
    pub user_id: String,
    pub display_name: String,
}

impl NotificationTarget {
    pub fn new(item_id: &str, user_id: &str, display_name: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Port to the external to-do system.
///
/// Both operations are idempotent in intent: issuing an already-issued
/// record or retracting an already-retracted one is expected to succeed
/// on the remote side.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Create a pending-action record for a user on a node.
    async fn issue(&self, target: &NotificationTarget) -> Result<(), GatewayError>;

    /// Remove the pending-action record of a completed task for a user.
    async fn retract(&self, target: &NotificationTarget) -> Result<(), GatewayError>;
}
