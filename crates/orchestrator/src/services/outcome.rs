//! Orchestration outcomes and non-fatal warnings.
//!
//! Once the engine commit has succeeded there is no rollback: every
//! later failure (audit persistence, retraction, navigation, issuance)
//! degrades to a warning carried on an otherwise successful outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::ProcessInstanceSummary;

/// Saga stage a warning originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStage {
    /// Submitted-form audit persistence failed.
    Audit,
    /// A pending notice could not be retracted.
    Retract,
    /// Next nodes could not be resolved after the commit.
    Navigation,
    /// A pending notice could not be issued.
    Issue,
}

/// A non-fatal failure collected during orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationWarning {
    pub stage: WarningStage,
    pub message: String,
}

impl OrchestrationWarning {
    pub fn new<S: Into<String>>(stage: WarningStage, message: S) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Result of a successful task completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletionOutcome {
    pub task_id: String,
    pub process_instance_id: String,
    pub process_definition_id: String,
    pub completed_at: DateTime<Utc>,
    /// Node ids for which at least one pending notice was issued.
    pub notified_nodes: Vec<String>,
    pub warnings: Vec<OrchestrationWarning>,
}

/// Result of a successful process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStartOutcome {
    pub process_instance: ProcessInstanceSummary,
    /// Node ids for which at least one pending notice was issued.
    pub notified_nodes: Vec<String>,
    pub warnings: Vec<OrchestrationWarning>,
}
