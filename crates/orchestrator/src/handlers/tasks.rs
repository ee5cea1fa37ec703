//! Task API handlers.
//!
//! Completion, form resolution, and instance-variable endpoints.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::model::FormSubmission;
use crate::services::{ProcessVariableView, TaskCompletionOutcome, TaskFormView};
use crate::state::AppState;

/// Request to complete a task with a submitted form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteTaskRequest {
    /// Form definition id the values were submitted against.
    pub form_id: String,
    #[serde(default)]
    pub values: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    /// User performing the completion.
    pub acting_user: String,
}

impl CompleteTaskRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.form_id.trim().is_empty() {
            return Err("'form_id' must be provided".to_string());
        }
        if self.acting_user.trim().is_empty() {
            return Err("'acting_user' must be provided".to_string());
        }
        Ok(())
    }
}

/// Complete a task.
///
/// `POST /api/tasks/{task_id}/complete`
pub async fn complete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(request): Json<CompleteTaskRequest>,
) -> AppResult<Json<TaskCompletionOutcome>> {
    request.validate().map_err(AppError::Validation)?;

    debug!(
        task_id = %task_id,
        form_id = %request.form_id,
        user = %request.acting_user,
        "Complete task request"
    );

    let submission = FormSubmission {
        form_id: request.form_id,
        values: request.values,
        outcome: request.outcome,
    };

    let outcome = state
        .completion
        .complete_task(&task_id, &submission, &request.acting_user)
        .await?;

    Ok(Json(outcome))
}

/// Resolve the form for a task.
///
/// `GET /api/tasks/{task_id}/form`
pub async fn task_form(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<TaskFormView>> {
    Ok(Json(state.task_forms.task_form(&task_id).await?))
}

/// List the variables of the instance owning a task.
///
/// `GET /api/tasks/{task_id}/variables`
pub async fn task_variables(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> AppResult<Json<Vec<ProcessVariableView>>> {
    Ok(Json(state.task_forms.instance_variables(&task_id).await?))
}
