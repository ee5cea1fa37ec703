//! In-memory doubles of the ports, shared by the orchestrator tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::gateway::{GatewayError, NotificationGateway, NotificationTarget};
use crate::model::forms::{FieldKind, FormField};
use crate::model::{FormDefinition, FormSubmission, VariableSet};
use crate::ports::{
    FormRepository, IdentityDirectory, ProcessDefinitionMeta, ProcessEngine,
    ProcessInstanceSummary, TaskContext, User,
};

/// A form with a single required boolean field `approved`.
pub fn form_with_approved() -> FormDefinition {
    FormDefinition {
        id: "form-1".to_string(),
        key: "review-form".to_string(),
        name: Some("Review".to_string()),
        fields: vec![FormField {
            id: "approved".to_string(),
            name: None,
            kind: FieldKind::Boolean,
            required: true,
        }],
    }
}

/// A submission of [`form_with_approved`] with the given decision.
pub fn submission_approved(approved: bool) -> FormSubmission {
    FormSubmission {
        form_id: "form-1".to_string(),
        values: [("approved".to_string(), serde_json::json!(approved))]
            .into_iter()
            .collect(),
        outcome: None,
    }
}

/// Record of a started instance.
pub struct StartedInstance {
    pub definition_id: String,
    pub variables: VariableSet,
    pub name: Option<String>,
    pub started_by: String,
}

/// Engine double backed by maps, recording mutations.
#[derive(Default)]
pub struct StubEngine {
    tasks: HashMap<String, TaskContext>,
    models: HashMap<String, serde_json::Value>,
    definitions: HashMap<String, ProcessDefinitionMeta>,
    initiators: HashMap<String, String>,
    historic: VariableSet,
    fail_completion: Option<String>,
    fail_start: Option<String>,
    pub completions: Mutex<Vec<(String, VariableSet)>>,
    pub started: Mutex<Vec<StartedInstance>>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A task whose form key matches [`form_with_approved`].
    pub fn task(
        id: &str,
        process_instance_id: &str,
        process_definition_id: &str,
        task_definition_key: &str,
        assignee: &str,
    ) -> TaskContext {
        TaskContext {
            id: id.to_string(),
            process_instance_id: process_instance_id.to_string(),
            process_definition_id: process_definition_id.to_string(),
            task_definition_key: task_definition_key.to_string(),
            form_key: Some("review-form".to_string()),
            owner: None,
            assignee: Some(assignee.to_string()),
            candidate_users: vec![],
            initiator_can_complete: false,
        }
    }

    pub fn with_task(mut self, task: TaskContext) -> Self {
        self.tasks.insert(task.id.clone(), task);
        self
    }

    pub fn with_model(mut self, definition_id: &str, model: serde_json::Value) -> Self {
        self.models.insert(definition_id.to_string(), model);
        self
    }

    pub fn with_definition(mut self, definition: ProcessDefinitionMeta) -> Self {
        self.definitions.insert(definition.id.clone(), definition);
        self
    }

    pub fn with_initiator(mut self, process_instance_id: &str, user_id: &str) -> Self {
        self.initiators
            .insert(process_instance_id.to_string(), user_id.to_string());
        self
    }

    pub fn with_historic(mut self, variables: VariableSet) -> Self {
        self.historic = variables;
        self
    }

    pub fn failing_completion(mut self, message: &str) -> Self {
        self.fail_completion = Some(message.to_string());
        self
    }

    pub fn failing_start(mut self, message: &str) -> Self {
        self.fail_start = Some(message.to_string());
        self
    }
}

#[async_trait]
impl ProcessEngine for StubEngine {
    async fn task_by_id(&self, task_id: &str) -> AppResult<Option<TaskContext>> {
        Ok(self.tasks.get(task_id).cloned())
    }

    async fn definition_by_id(
        &self,
        definition_id: &str,
    ) -> AppResult<Option<ProcessDefinitionMeta>> {
        Ok(self.definitions.get(definition_id).cloned())
    }

    async fn model_json(&self, definition_id: &str) -> AppResult<Option<serde_json::Value>> {
        Ok(self.models.get(definition_id).cloned())
    }

    async fn historic_variables(&self, _process_instance_id: &str) -> AppResult<VariableSet> {
        Ok(self.historic.clone())
    }

    async fn instance_initiator(&self, process_instance_id: &str) -> AppResult<Option<String>> {
        Ok(self.initiators.get(process_instance_id).cloned())
    }

    async fn complete_task(&self, task_id: &str, variables: &VariableSet) -> AppResult<()> {
        if let Some(message) = &self.fail_completion {
            return Err(AppError::Engine(message.clone()));
        }
        self.completions
            .lock()
            .unwrap()
            .push((task_id.to_string(), variables.clone()));
        Ok(())
    }

    async fn start_instance(
        &self,
        definition_id: &str,
        variables: &VariableSet,
        name: Option<&str>,
        started_by: &str,
    ) -> AppResult<ProcessInstanceSummary> {
        if let Some(message) = &self.fail_start {
            return Err(AppError::Engine(message.clone()));
        }
        self.started.lock().unwrap().push(StartedInstance {
            definition_id: definition_id.to_string(),
            variables: variables.clone(),
            name: name.map(|n| n.to_string()),
            started_by: started_by.to_string(),
        });
        Ok(ProcessInstanceSummary {
            id: "pi-new".to_string(),
            process_definition_id: definition_id.to_string(),
            name: name.map(|n| n.to_string()),
            start_user_id: Some(started_by.to_string()),
            started_at: Utc::now(),
            ended_at: None,
        })
    }
}

/// Form repository double, recording audit writes.
#[derive(Default)]
pub struct StubForms {
    forms: Vec<FormDefinition>,
    fail_store: bool,
    /// (task id, process instance id) per stored submission.
    pub stored: Mutex<Vec<(Option<String>, String)>>,
}

impl StubForms {
    pub fn with_form(form: FormDefinition) -> Self {
        Self {
            forms: vec![form],
            ..Self::default()
        }
    }

    pub fn failing_store(mut self) -> Self {
        self.fail_store = true;
        self
    }
}

#[async_trait]
impl FormRepository for StubForms {
    async fn form_by_id(&self, form_id: &str) -> AppResult<Option<FormDefinition>> {
        Ok(self.forms.iter().find(|f| f.id == form_id).cloned())
    }

    async fn form_by_key(&self, form_key: &str) -> AppResult<Option<FormDefinition>> {
        Ok(self.forms.iter().find(|f| f.key == form_key).cloned())
    }

    async fn store_submitted(
        &self,
        _form: &FormDefinition,
        task_id: Option<&str>,
        process_instance_id: &str,
        _variables: &VariableSet,
    ) -> AppResult<()> {
        if self.fail_store {
            return Err(AppError::Internal("audit store unavailable".to_string()));
        }
        self.stored.lock().unwrap().push((
            task_id.map(|t| t.to_string()),
            process_instance_id.to_string(),
        ));
        Ok(())
    }
}

/// Identity directory double.
#[derive(Default)]
pub struct StubIdentity {
    users: HashMap<String, User>,
}

impl StubIdentity {
    /// Build from (id, last name, first name) triples.
    pub fn with_users(users: &[(&str, &str, &str)]) -> Self {
        Self {
            users: users
                .iter()
                .map(|(id, last, first)| {
                    (
                        id.to_string(),
                        User {
                            id: id.to_string(),
                            first_name: Some(first.to_string()),
                            last_name: Some(last.to_string()),
                            email: None,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityDirectory for StubIdentity {
    async fn users_by_ids(&self, ids: &[String]) -> AppResult<HashMap<String, User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| (id.clone(), u.clone())))
            .collect())
    }
}

/// Gateway double recording every call, optionally failing.
#[derive(Default)]
pub struct RecordingGateway {
    fail_issue: bool,
    fail_retract: bool,
    pub issued: Mutex<Vec<NotificationTarget>>,
    pub retracted: Mutex<Vec<NotificationTarget>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_issue(mut self) -> Self {
        self.fail_issue = true;
        self
    }

    pub fn failing_retract(mut self) -> Self {
        self.fail_retract = true;
        self
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn issue(&self, target: &NotificationTarget) -> Result<(), GatewayError> {
        if self.fail_issue {
            return Err(GatewayError::Transport("to-do system down".to_string()));
        }
        self.issued.lock().unwrap().push(target.clone());
        Ok(())
    }

    async fn retract(&self, target: &NotificationTarget) -> Result<(), GatewayError> {
        if self.fail_retract {
            return Err(GatewayError::Transport("to-do system down".to_string()));
        }
        self.retracted.lock().unwrap().push(target.clone());
        Ok(())
    }
}
