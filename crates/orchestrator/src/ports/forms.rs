//! Form repository port.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::model::{FormDefinition, VariableSet};

/// Port to the form repository.
#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Look up a form definition by id.
    async fn form_by_id(&self, form_id: &str) -> AppResult<Option<FormDefinition>>;

    /// Look up the latest form definition for a key.
    async fn form_by_key(&self, form_key: &str) -> AppResult<Option<FormDefinition>>;

    /// Persist a submitted form against the process instance (audit
    /// trail). `task_id` is absent for start forms.
    async fn store_submitted(
        &self,
        form: &FormDefinition,
        task_id: Option<&str>,
        process_instance_id: &str,
        variables: &VariableSet,
    ) -> AppResult<()>;
}
