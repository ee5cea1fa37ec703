//! Process instance API handlers.

use std::collections::HashMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::services::{ProcessStartOutcome, StartProcessRequest};
use crate::state::AppState;

/// Request to start a new process instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartInstanceRequest {
    pub process_definition_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub values: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    /// User starting the instance.
    pub acting_user: String,
}

/// Request to resolve the instance owning a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceQueryRequest {
    pub task_id: String,
}

/// Response for the instance query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceQueryResponse {
    pub process_instance_id: String,
}

/// Start a process instance.
///
/// `POST /api/process-instances`
pub async fn start_instance(
    State(state): State<AppState>,
    Json(request): Json<StartInstanceRequest>,
) -> AppResult<Json<ProcessStartOutcome>> {
    if request.acting_user.trim().is_empty() {
        return Err(AppError::Validation(
            "'acting_user' must be provided".to_string(),
        ));
    }

    debug!(
        definition_id = %request.process_definition_id,
        user = %request.acting_user,
        "Start process request"
    );

    let start = StartProcessRequest {
        process_definition_id: request.process_definition_id,
        name: request.name,
        values: request.values,
        outcome: request.outcome,
    };

    let outcome = state
        .start
        .start_process(&start, &request.acting_user)
        .await?;

    Ok(Json(outcome))
}

/// Resolve the process instance owning a task.
///
/// `POST /api/query/process-instance`
pub async fn query_instance_by_task(
    State(state): State<AppState>,
    Json(request): Json<InstanceQueryRequest>,
) -> AppResult<Json<InstanceQueryResponse>> {
    let process_instance_id = state
        .task_forms
        .instance_id_for_task(&request.task_id)
        .await?;

    Ok(Json(InstanceQueryResponse {
        process_instance_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_deserialization() {
        let json = r#"{
            "process_definition_id": "loan-v1",
            "values": {"amount": 9000},
            "acting_user": "dave"
        }"#;

        let request: StartInstanceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.process_definition_id, "loan-v1");
        assert!(request.name.is_none());
        assert_eq!(request.values["amount"], serde_json::json!(9000));
    }

    #[test]
    fn test_query_response_serialization() {
        let response = InstanceQueryResponse {
            process_instance_id: "pi-1".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("pi-1"));
    }
}
