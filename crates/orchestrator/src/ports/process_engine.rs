//! Process engine port.
//!
//! The engine owns all process state; this layer only reads task and
//! definition data and commits completions/starts. Engine-rejected
//! mutations surface as [`AppError::Engine`] from the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::model::VariableSet;

/// A runtime task as seen by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    pub id: String,
    pub process_instance_id: String,
    pub process_definition_id: String,
    /// Node id of the task within its definition's graph.
    pub task_definition_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub candidate_users: Vec<String>,
    /// Whether the task configuration lets the instance initiator
    /// complete it in place of the assignee.
    #[serde(default)]
    pub initiator_can_complete: bool,
}

/// A deployed process definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDefinitionMeta {
    pub id: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub version: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
}

/// Summary of a started or running process instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInstanceSummary {
    pub id: String,
    pub process_definition_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_user_id: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Port to the process engine.
#[async_trait]
pub trait ProcessEngine: Send + Sync {
    /// Look up a runtime task by id.
    async fn task_by_id(&self, task_id: &str) -> AppResult<Option<TaskContext>>;

    /// Look up a deployed process definition by id.
    async fn definition_by_id(&self, definition_id: &str)
        -> AppResult<Option<ProcessDefinitionMeta>>;

    /// Retrieve the raw process model JSON for a definition.
    async fn model_json(&self, definition_id: &str) -> AppResult<Option<serde_json::Value>>;

    /// Historic variables of a process instance, latest value per name.
    async fn historic_variables(&self, process_instance_id: &str) -> AppResult<VariableSet>;

    /// The user who started the instance, if recorded.
    async fn instance_initiator(&self, process_instance_id: &str) -> AppResult<Option<String>>;

    /// Commit a task completion with the extracted variables.
    async fn complete_task(&self, task_id: &str, variables: &VariableSet) -> AppResult<()>;

    /// Start a new process instance on behalf of `started_by`.
    async fn start_instance(
        &self,
        definition_id: &str,
        variables: &VariableSet,
        name: Option<&str>,
        started_by: &str,
    ) -> AppResult<ProcessInstanceSummary>;
}
