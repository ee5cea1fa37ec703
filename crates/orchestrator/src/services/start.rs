//! Process start orchestration.
//!
//! Mirror of the completion saga without a retraction step: resolve the
//! definition, extract start-form variables when a start form is
//! configured, commit the start to the engine, then traverse from the
//! initial node and issue pending notices for the first user tasks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::ProcessGraphNavigator;
use crate::error::{AppError, AppResult};
use crate::gateway::NotificationGateway;
use crate::model::forms::variables_from_submission;
use crate::model::{FlowNode, FormDefinition, FormSubmission, GraphCache, VariableSet};
use crate::ports::{FormRepository, IdentityDirectory, ProcessEngine};
use crate::result_ext::ResultExt;
use crate::services::notify;
use crate::services::outcome::{OrchestrationWarning, ProcessStartOutcome, WarningStage};

/// Request to start a new process instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartProcessRequest {
    pub process_definition_id: String,
    /// Business name for the new instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Start-form values, if the definition has a start form.
    #[serde(default)]
    pub values: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl StartProcessRequest {
    fn has_payload(&self) -> bool {
        !self.values.is_empty() || self.outcome.is_some()
    }
}

/// Orchestrates process starts against the engine and the to-do system.
pub struct ProcessStartOrchestrator {
    engine: Arc<dyn ProcessEngine>,
    forms: Arc<dyn FormRepository>,
    identity: Arc<dyn IdentityDirectory>,
    gateway: Arc<dyn NotificationGateway>,
    graphs: Arc<GraphCache>,
    navigator: ProcessGraphNavigator,
}

impl ProcessStartOrchestrator {
    pub fn new(
        engine: Arc<dyn ProcessEngine>,
        forms: Arc<dyn FormRepository>,
        identity: Arc<dyn IdentityDirectory>,
        gateway: Arc<dyn NotificationGateway>,
        graphs: Arc<GraphCache>,
    ) -> Self {
        Self {
            engine,
            forms,
            identity,
            gateway,
            graphs,
            navigator: ProcessGraphNavigator::new(),
        }
    }

    /// Start a process instance on behalf of `acting_user`.
    pub async fn start_process(
        &self,
        request: &StartProcessRequest,
        acting_user: &str,
    ) -> AppResult<ProcessStartOutcome> {
        if request.process_definition_id.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Process definition id is required".to_string(),
            ));
        }

        let definition = self
            .engine
            .definition_by_id(&request.process_definition_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Process definition not found: {}",
                    request.process_definition_id
                ))
            })?;

        let mut warnings: Vec<OrchestrationWarning> = Vec::new();

        // Start-form extraction, only when values were actually submitted
        let start_form = if request.has_payload() {
            self.resolve_start_form(&definition.id, request).await?
        } else {
            None
        };

        let variables: VariableSet = start_form
            .as_ref()
            .map(|(_, vars)| vars.clone())
            .unwrap_or_default();

        let instance = self
            .engine
            .start_instance(
                &definition.id,
                &variables,
                request.name.as_deref(),
                acting_user,
            )
            .await?;

        info!(
            process_instance_id = %instance.id,
            definition_id = %definition.id,
            user = %acting_user,
            "Process instance started"
        );

        // Audit trail for the start form, independent of the start commit
        if let Some((form, vars)) = &start_form {
            if let Err(e) = self
                .forms
                .store_submitted(form, None, &instance.id, vars)
                .await
                .log("storing submitted start form")
            {
                warnings.push(OrchestrationWarning::new(
                    WarningStage::Audit,
                    format!("Submitted start form not persisted: {}", e),
                ));
            }
        }

        let next_nodes = self
            .next_from_initial(&definition.id, &variables, &mut warnings)
            .await;
        let notified_nodes = notify::issue_for_nodes(
            self.gateway.as_ref(),
            self.identity.as_ref(),
            &next_nodes,
            &mut warnings,
        )
        .await;

        Ok(ProcessStartOutcome {
            process_instance: instance,
            notified_nodes,
            warnings,
        })
    }

    /// Resolve the start form from the initial node's form key and
    /// extract the submitted variables. Values submitted against a
    /// definition without a start form are dropped.
    async fn resolve_start_form(
        &self,
        definition_id: &str,
        request: &StartProcessRequest,
    ) -> AppResult<Option<(FormDefinition, VariableSet)>> {
        let graph = self
            .graphs
            .get_or_load(definition_id, self.engine.as_ref())
            .await?;

        let initial = graph.initial_node().ok_or_else(|| {
            AppError::Graph(format!("Definition {} has no start event", definition_id))
        })?;

        let form_key = match &initial.form_key {
            Some(key) => key,
            None => {
                debug!(
                    definition_id = %definition_id,
                    "Values submitted but no start form configured; ignoring them"
                );
                return Ok(None);
            }
        };

        let form = self.forms.form_by_key(form_key).await?.ok_or_else(|| {
            AppError::NotFound(format!("Start form not found for key: {}", form_key))
        })?;

        let submission = FormSubmission {
            form_id: form.id.clone(),
            values: request.values.clone(),
            outcome: request.outcome.clone(),
        };
        let variables = variables_from_submission(&form, &submission)?;

        Ok(Some((form, variables)))
    }

    /// Next user tasks from the initial node. Runs after the start
    /// commit, so every failure degrades to a navigation warning.
    async fn next_from_initial(
        &self,
        definition_id: &str,
        variables: &VariableSet,
        warnings: &mut Vec<OrchestrationWarning>,
    ) -> Vec<FlowNode> {
        let result = async {
            let graph = self
                .graphs
                .get_or_load(definition_id, self.engine.as_ref())
                .await?;
            let initial = graph.initial_node().ok_or_else(|| {
                AppError::Graph(format!("Definition {} has no start event", definition_id))
            })?;
            self.navigator
                .next_user_task_nodes(&graph, &initial.id, variables)
        }
        .await;

        match result {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(
                    definition_id = %definition_id,
                    error = %e,
                    "Next-node resolution failed after start; no notices issued"
                );
                warnings.push(OrchestrationWarning::new(
                    WarningStage::Navigation,
                    format!("Next-node resolution failed; no notices issued: {}", e),
                ));
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::forms::{FieldKind, FormField};
    use crate::ports::ProcessDefinitionMeta;
    use crate::services::testkit::{RecordingGateway, StubEngine, StubForms, StubIdentity};

    fn definition(id: &str) -> ProcessDefinitionMeta {
        ProcessDefinitionMeta {
            id: id.to_string(),
            key: "loan".to_string(),
            name: Some("Loan approval".to_string()),
            version: 1,
            deployment_id: Some("dep-1".to_string()),
        }
    }

    fn start_form() -> FormDefinition {
        FormDefinition {
            id: "form-start".to_string(),
            key: "loan-start".to_string(),
            name: None,
            fields: vec![FormField {
                id: "amount".to_string(),
                name: None,
                kind: FieldKind::Integer,
                required: true,
            }],
        }
    }

    /// loan-v1: start (form loan-start) -> review (assignee alice).
    fn loan_engine(with_start_form: bool) -> StubEngine {
        let form_key = if with_start_form {
            serde_json::json!("loan-start")
        } else {
            serde_json::Value::Null
        };
        StubEngine::new()
            .with_definition(definition("loan-v1"))
            .with_model(
                "loan-v1",
                serde_json::json!({
                    "nodes": [
                        {"id": "start", "type": "startEvent", "formKey": form_key},
                        {"id": "review", "type": "userTask", "assignee": "alice"},
                        {"id": "end", "type": "endEvent"}
                    ],
                    "flows": [
                        {"source": "start", "target": "review"},
                        {"source": "review", "target": "end"}
                    ]
                }),
            )
    }

    fn request(definition_id: &str) -> StartProcessRequest {
        StartProcessRequest {
            process_definition_id: definition_id.to_string(),
            name: None,
            values: HashMap::new(),
            outcome: None,
        }
    }

    fn orchestrator(
        engine: Arc<StubEngine>,
        forms: Arc<StubForms>,
        identity: Arc<StubIdentity>,
        gateway: Arc<RecordingGateway>,
    ) -> ProcessStartOrchestrator {
        ProcessStartOrchestrator::new(engine, forms, identity, gateway, Arc::new(GraphCache::new()))
    }

    #[tokio::test]
    async fn test_start_without_form_skips_extraction() {
        let engine = Arc::new(loan_engine(false));
        let forms = Arc::new(StubForms::default());
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine.clone(),
            forms.clone(),
            Arc::new(StubIdentity::with_users(&[("alice", "Cooper", "Alice")])),
            gateway.clone(),
        );

        let outcome = orchestrator
            .start_process(&request("loan-v1"), "dave")
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.notified_nodes, vec!["review"]);
        assert_eq!(outcome.process_instance.start_user_id.as_deref(), Some("dave"));

        // Instance started with empty variables, nothing stored
        let started = engine.started.lock().unwrap();
        assert_eq!(started.len(), 1);
        assert!(started[0].variables.is_empty());
        assert_eq!(started[0].started_by, "dave");
        assert!(forms.stored.lock().unwrap().is_empty());

        // First user task notified
        let issued = gateway.issued.lock().unwrap();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].item_id, "review");
        assert_eq!(issued[0].user_id, "alice");
    }

    #[tokio::test]
    async fn test_start_with_form_extracts_and_stores() {
        let engine = Arc::new(loan_engine(true));
        let forms = Arc::new(StubForms::with_form(start_form()));
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine.clone(),
            forms.clone(),
            Arc::new(StubIdentity::with_users(&[("alice", "Cooper", "Alice")])),
            gateway,
        );

        let mut req = request("loan-v1");
        req.values
            .insert("amount".to_string(), serde_json::json!(9000));

        let outcome = orchestrator.start_process(&req, "dave").await.unwrap();

        assert!(outcome.warnings.is_empty());

        let started = engine.started.lock().unwrap();
        assert_eq!(started[0].variables["amount"], serde_json::json!(9000));

        // Start form persisted against the new instance, no task id
        let stored = forms.stored.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], (None, "pi-new".to_string()));
    }

    #[tokio::test]
    async fn test_blank_definition_id() {
        let orchestrator = orchestrator(
            Arc::new(StubEngine::new()),
            Arc::new(StubForms::default()),
            Arc::new(StubIdentity::default()),
            Arc::new(RecordingGateway::new()),
        );

        let result = orchestrator.start_process(&request("  "), "dave").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_unknown_definition() {
        let orchestrator = orchestrator(
            Arc::new(StubEngine::new()),
            Arc::new(StubForms::default()),
            Arc::new(StubIdentity::default()),
            Arc::new(RecordingGateway::new()),
        );

        let result = orchestrator.start_process(&request("ghost"), "dave").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_start_values_abort_before_start() {
        let engine = Arc::new(loan_engine(true));

        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(StubForms::with_form(start_form())),
            Arc::new(StubIdentity::default()),
            Arc::new(RecordingGateway::new()),
        );

        let mut req = request("loan-v1");
        req.values
            .insert("amount".to_string(), serde_json::json!("not-a-number"));

        let result = orchestrator.start_process(&req, "dave").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(engine.started.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_start_failure_is_fatal() {
        let engine = Arc::new(loan_engine(false).failing_start("definition suspended"));
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine,
            Arc::new(StubForms::default()),
            Arc::new(StubIdentity::default()),
            gateway.clone(),
        );

        let result = orchestrator.start_process(&request("loan-v1"), "dave").await;
        assert!(matches!(result, Err(AppError::Engine(_))));
        assert!(gateway.issued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_issue_failure_is_warning() {
        let engine = Arc::new(loan_engine(false));
        let gateway = Arc::new(RecordingGateway::new().failing_issue());

        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(StubForms::default()),
            Arc::new(StubIdentity::with_users(&[("alice", "Cooper", "Alice")])),
            gateway,
        );

        let outcome = orchestrator
            .start_process(&request("loan-v1"), "dave")
            .await
            .unwrap();

        // The start committed; the failed issuance is a warning
        assert_eq!(engine.started.lock().unwrap().len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].stage, WarningStage::Issue);
        assert!(outcome.notified_nodes.is_empty());
    }
}
