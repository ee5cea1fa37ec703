//! REST client to the process engine's API.
//!
//! One client implements all three ports: the engine exposes its task,
//! repository, history, form, and identity resources under a single base
//! URL. Read failures map to `Internal`; rejected mutations map to
//! `Engine`, since after a failed commit call the true process state is
//! only known to the engine.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::model::{FormDefinition, VariableSet};
use crate::ports::{
    FormRepository, IdentityDirectory, ProcessDefinitionMeta, ProcessEngine,
    ProcessInstanceSummary, TaskContext, User,
};

/// Reqwest-backed client to the engine REST API.
#[derive(Clone)]
pub struct RestEngineClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CompleteTaskPayload<'a> {
    variables: &'a VariableSet,
}

#[derive(Debug, Serialize)]
struct StartInstancePayload<'a> {
    process_definition_id: &'a str,
    variables: &'a VariableSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    started_by: &'a str,
}

#[derive(Debug, Serialize)]
struct StoreSubmittedPayload<'a> {
    form_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'a str>,
    process_instance_id: &'a str,
    variables: &'a VariableSet,
}

#[derive(Debug, Serialize)]
struct UsersQueryPayload<'a> {
    ids: &'a [String],
}

impl RestEngineClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a resource; 404 becomes `None`, other failures `Internal`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> AppResult<Option<T>> {
        let res = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Engine request failed: {}", e)))?;

        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Engine returned {} for {}: {}",
                status, path, body
            )));
        }

        let parsed = res
            .json::<T>()
            .await
            .map_err(|e| AppError::Internal(format!("Engine response parse error: {}", e)))?;
        Ok(Some(parsed))
    }

    /// POST a mutation; non-success becomes `Engine`.
    async fn post_engine<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let res = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Engine(format!("Engine request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::Engine(format!(
                "Engine rejected {}: {} - {}",
                path, status, text
            )));
        }

        res.json::<T>()
            .await
            .map_err(|e| AppError::Engine(format!("Engine response parse error: {}", e)))
    }

    /// POST a mutation whose response body is irrelevant.
    async fn post_engine_unit<B: Serialize>(&self, path: &str, body: &B) -> AppResult<()> {
        let res = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Engine(format!("Engine request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::Engine(format!(
                "Engine rejected {}: {} - {}",
                path, status, text
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessEngine for RestEngineClient {
    async fn task_by_id(&self, task_id: &str) -> AppResult<Option<TaskContext>> {
        self.get_optional(&format!("/api/runtime/tasks/{}", task_id))
            .await
    }

    async fn definition_by_id(
        &self,
        definition_id: &str,
    ) -> AppResult<Option<ProcessDefinitionMeta>> {
        self.get_optional(&format!(
            "/api/repository/process-definitions/{}",
            definition_id
        ))
        .await
    }

    async fn model_json(&self, definition_id: &str) -> AppResult<Option<serde_json::Value>> {
        self.get_optional(&format!(
            "/api/repository/process-definitions/{}/model",
            definition_id
        ))
        .await
    }

    async fn historic_variables(&self, process_instance_id: &str) -> AppResult<VariableSet> {
        let variables: Option<VariableSet> = self
            .get_optional(&format!(
                "/api/history/process-instances/{}/variables",
                process_instance_id
            ))
            .await?;
        Ok(variables.unwrap_or_default())
    }

    async fn instance_initiator(&self, process_instance_id: &str) -> AppResult<Option<String>> {
        let instance: Option<ProcessInstanceSummary> = self
            .get_optional(&format!(
                "/api/history/process-instances/{}",
                process_instance_id
            ))
            .await?;
        Ok(instance.and_then(|i| i.start_user_id))
    }

    async fn complete_task(&self, task_id: &str, variables: &VariableSet) -> AppResult<()> {
        self.post_engine_unit(
            &format!("/api/runtime/tasks/{}/complete", task_id),
            &CompleteTaskPayload { variables },
        )
        .await
    }

    async fn start_instance(
        &self,
        definition_id: &str,
        variables: &VariableSet,
        name: Option<&str>,
        started_by: &str,
    ) -> AppResult<ProcessInstanceSummary> {
        self.post_engine(
            "/api/runtime/process-instances",
            &StartInstancePayload {
                process_definition_id: definition_id,
                variables,
                name,
                started_by,
            },
        )
        .await
    }
}

#[async_trait]
impl FormRepository for RestEngineClient {
    async fn form_by_id(&self, form_id: &str) -> AppResult<Option<FormDefinition>> {
        self.get_optional(&format!("/api/form/forms/{}", form_id))
            .await
    }

    async fn form_by_key(&self, form_key: &str) -> AppResult<Option<FormDefinition>> {
        self.get_optional(&format!("/api/form/forms/key/{}", form_key))
            .await
    }

    async fn store_submitted(
        &self,
        form: &FormDefinition,
        task_id: Option<&str>,
        process_instance_id: &str,
        variables: &VariableSet,
    ) -> AppResult<()> {
        self.post_engine_unit(
            "/api/form/submitted-forms",
            &StoreSubmittedPayload {
                form_id: &form.id,
                task_id,
                process_instance_id,
                variables,
            },
        )
        .await
    }
}

#[async_trait]
impl IdentityDirectory for RestEngineClient {
    async fn users_by_ids(&self, ids: &[String]) -> AppResult<HashMap<String, User>> {
        let users: Vec<User> = self
            .post_engine("/api/identity/users/query", &UsersQueryPayload { ids })
            .await?;
        Ok(users.into_iter().map(|u| (u.id.clone(), u)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = RestEngineClient::new("http://engine:8080/", reqwest::Client::new());
        assert_eq!(
            client.url("/api/runtime/tasks/t1"),
            "http://engine:8080/api/runtime/tasks/t1"
        );
    }

    #[test]
    fn test_start_payload_shape() {
        let variables = VariableSet::new();
        let payload = StartInstancePayload {
            process_definition_id: "loan-v1",
            variables: &variables,
            name: None,
            started_by: "dave",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["process_definition_id"], "loan-v1");
        assert_eq!(json["started_by"], "dave");
        assert!(json.get("name").is_none());
    }
}
