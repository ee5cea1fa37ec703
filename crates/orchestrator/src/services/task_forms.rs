//! Task form and process-variable queries.
//!
//! Read-only companions to the orchestrators: resolve the form a task
//! should render (with the instance's historic variables for
//! pre-filling), list an instance's variables, and map a task to its
//! owning instance.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::model::{FormDefinition, VariableSet};
use crate::ports::{FormRepository, ProcessEngine};

/// A task's form together with the variables to pre-fill it from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFormView {
    pub task_id: String,
    pub form: FormDefinition,
    pub variables: VariableSet,
}

/// A single process-instance variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVariableView {
    pub name: String,
    /// JSON type of the value (string, number, bool, ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub value: serde_json::Value,
}

/// Read-side service for task forms and instance variables.
pub struct TaskFormService {
    engine: Arc<dyn ProcessEngine>,
    forms: Arc<dyn FormRepository>,
}

impl TaskFormService {
    pub fn new(engine: Arc<dyn ProcessEngine>, forms: Arc<dyn FormRepository>) -> Self {
        Self { engine, forms }
    }

    /// Resolve the form for a task, folding in the instance's historic
    /// variables.
    pub async fn task_form(&self, task_id: &str) -> AppResult<TaskFormView> {
        let task = self
            .engine
            .task_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task not found: {}", task_id)))?;

        let form_key = task.form_key.as_deref().ok_or_else(|| {
            AppError::NotFound(format!("Task {} has no form configured", task_id))
        })?;

        let form = self.forms.form_by_key(form_key).await?.ok_or_else(|| {
            AppError::NotFound(format!(
                "Form definition for task {} cannot be found for form key {}",
                task.task_definition_key, form_key
            ))
        })?;

        let variables = self
            .engine
            .historic_variables(&task.process_instance_id)
            .await?;

        Ok(TaskFormView {
            task_id: task.id,
            form,
            variables,
        })
    }

    /// All variables of the instance owning a task, sorted by name.
    pub async fn instance_variables(&self, task_id: &str) -> AppResult<Vec<ProcessVariableView>> {
        let task = self
            .engine
            .task_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task not found: {}", task_id)))?;

        let variables = self
            .engine
            .historic_variables(&task.process_instance_id)
            .await?;

        let mut views: Vec<ProcessVariableView> = variables
            .into_iter()
            .map(|(name, value)| ProcessVariableView {
                name,
                kind: json_type_name(&value).to_string(),
                value,
            })
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(views)
    }

    /// The process instance a task belongs to.
    pub async fn instance_id_for_task(&self, task_id: &str) -> AppResult<String> {
        let task = self
            .engine
            .task_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task not found: {}", task_id)))?;

        Ok(task.process_instance_id)
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testkit::{form_with_approved, StubEngine, StubForms};

    fn service_with_historic() -> TaskFormService {
        let mut historic = VariableSet::new();
        historic.insert("amount".to_string(), serde_json::json!(9000));
        historic.insert("approved".to_string(), serde_json::json!(true));

        let engine = StubEngine::new()
            .with_task(StubEngine::task("t1", "pi-1", "def-1", "review", "alice"))
            .with_historic(historic);

        TaskFormService::new(
            Arc::new(engine),
            Arc::new(StubForms::with_form(form_with_approved())),
        )
    }

    #[tokio::test]
    async fn test_task_form_with_variables() {
        let service = service_with_historic();

        let view = service.task_form("t1").await.unwrap();
        assert_eq!(view.task_id, "t1");
        assert_eq!(view.form.key, "review-form");
        assert_eq!(view.variables["amount"], serde_json::json!(9000));
    }

    #[tokio::test]
    async fn test_instance_variables_sorted() {
        let service = service_with_historic();

        let vars = service.instance_variables("t1").await.unwrap();
        let names: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["amount", "approved"]);
        assert_eq!(vars[0].kind, "number");
        assert_eq!(vars[1].kind, "bool");
    }

    #[tokio::test]
    async fn test_instance_id_for_task() {
        let service = service_with_historic();
        assert_eq!(service.instance_id_for_task("t1").await.unwrap(), "pi-1");
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let service = service_with_historic();
        let result = service.task_form("ghost").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_task_without_form() {
        let mut task = StubEngine::task("t2", "pi-1", "def-1", "review", "alice");
        task.form_key = None;
        let engine = StubEngine::new().with_task(task);

        let service = TaskFormService::new(
            Arc::new(engine),
            Arc::new(StubForms::with_form(form_with_approved())),
        );

        let result = service.task_form("t2").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
