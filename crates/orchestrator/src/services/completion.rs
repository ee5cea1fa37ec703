//! Task completion orchestration.
//!
//! Coordinates the saga around completing a user task:
//!
//! 1. Resolve the task and its form, authorize the acting user, extract
//!    typed variables — all before any mutation.
//! 2. Persist the submitted form (audit) and retract the task's pending
//!    notice — both best-effort.
//! 3. Commit the completion to the process engine. This is the single
//!    non-reversible point: failures before it abort cleanly, failures
//!    after it degrade to warnings.
//! 4. Traverse the process graph and issue pending notices for the next
//!    user tasks.
//!
//! There is no transaction spanning the engine and the to-do system; a
//! stale or missing notice is accepted over blocking process progress.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::ProcessGraphNavigator;
use crate::error::{AppError, AppResult};
use crate::gateway::{NotificationGateway, NotificationTarget};
use crate::model::forms::variables_from_submission;
use crate::model::{FlowNode, FormSubmission, GraphCache, VariableSet};
use crate::ports::{FormRepository, IdentityDirectory, ProcessEngine, TaskContext};
use crate::result_ext::ResultExt;
use crate::services::notify;
use crate::services::outcome::{OrchestrationWarning, TaskCompletionOutcome, WarningStage};

/// Orchestrates task completion against the engine and the to-do system.
pub struct TaskCompletionOrchestrator {
    engine: Arc<dyn ProcessEngine>,
    forms: Arc<dyn FormRepository>,
    identity: Arc<dyn IdentityDirectory>,
    gateway: Arc<dyn NotificationGateway>,
    graphs: Arc<GraphCache>,
    navigator: ProcessGraphNavigator,
}

impl TaskCompletionOrchestrator {
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

    /// Complete a task from a form submission on behalf of `acting_user`.
    pub async fn complete_task(
        &self,
        task_id: &str,
        submission: &FormSubmission,
        acting_user: &str,
    ) -> AppResult<TaskCompletionOutcome> {
        let task = self
            .engine
            .task_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task not found: {}", task_id)))?;

        let form = self
            .forms
            .form_by_id(&submission.form_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Form definition not found: {}", submission.form_id))
            })?;

        if task.form_key.as_deref() != Some(form.key.as_str()) {
            return Err(AppError::NotFound(format!(
                "Form '{}' does not belong to task {}",
                form.key, task_id
            )));
        }

        self.authorize(&task, acting_user).await?;

        let variables = variables_from_submission(&form, submission)?;

        debug!(
            task_id = %task.id,
            process_instance_id = %task.process_instance_id,
            user = %acting_user,
            variables = variables.len(),
            "Completing task"
        );

        let mut warnings: Vec<OrchestrationWarning> = Vec::new();

        // Audit trail, independent of the engine commit
        if let Err(e) = self
            .forms
            .store_submitted(&form, Some(&task.id), &task.process_instance_id, &variables)
            .await
            .log("storing submitted form")
        {
            warnings.push(OrchestrationWarning::new(
                WarningStage::Audit,
                format!("Submitted form not persisted: {}", e),
            ));
        }

        self.retract_pending(&task, &mut warnings).await;

        // The commit point. Nothing below rolls back.
        self.engine.complete_task(&task.id, &variables).await?;

        info!(
            task_id = %task.id,
            process_instance_id = %task.process_instance_id,
            "Task completed"
        );

        let next_nodes = self.next_nodes(&task, &variables, &mut warnings).await;
        let notified_nodes = notify::issue_for_nodes(
            self.gateway.as_ref(),
            self.identity.as_ref(),
            &next_nodes,
            &mut warnings,
        )
        .await;

        Ok(TaskCompletionOutcome {
            task_id: task.id,
            process_instance_id: task.process_instance_id,
            process_definition_id: task.process_definition_id,
            completed_at: chrono::Utc::now(),
            notified_nodes,
            warnings,
        })
    }

    /// The acting user must be the task's owner or assignee, or the
    /// instance initiator when the task permits initiator completion.
    /// Runs before any mutation or gateway call.
    async fn authorize(&self, task: &TaskContext, acting_user: &str) -> AppResult<()> {
        if task.owner.as_deref() == Some(acting_user)
            || task.assignee.as_deref() == Some(acting_user)
        {
            return Ok(());
        }

        if task.initiator_can_complete {
            if let Some(initiator) = self
                .engine
                .instance_initiator(&task.process_instance_id)
                .await?
            {
                if initiator == acting_user {
                    return Ok(());
                }
            }
        }

        Err(AppError::NotPermitted(format!(
            "User '{}' may not complete task {}",
            acting_user, task.id
        )))
    }

    /// Retract the task's pending notice(s). Keyed by the assignee when
    /// one is set; fans out over the candidate users otherwise, symmetric
    /// with issuance. Never fatal.
    async fn retract_pending(&self, task: &TaskContext, warnings: &mut Vec<OrchestrationWarning>) {
        let recipients: Vec<String> = match &task.assignee {
            Some(assignee) => vec![assignee.clone()],
            None => task.candidate_users.clone(),
        };

        if recipients.is_empty() {
            debug!(task_id = %task.id, "No assignee or candidates; nothing to retract");
            return;
        }

        let users = match self.identity.users_by_ids(&recipients).await {
            Ok(users) => users,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Identity lookup failed; pending notices not retracted");
                warnings.push(OrchestrationWarning::new(
                    WarningStage::Retract,
                    format!("Identity lookup failed; pending notices not retracted: {}", e),
                ));
                return;
            }
        };

        let mut targets: Vec<NotificationTarget> = Vec::with_capacity(recipients.len());
        for user_id in &recipients {
            match users.get(user_id) {
                Some(user) => {
                    targets.push(NotificationTarget::new(&task.id, user_id, &user.display_name()))
                }
                None => {
                    warn!(task_id = %task.id, user = %user_id, "Unknown user; retraction skipped");
                    warnings.push(OrchestrationWarning::new(
                        WarningStage::Retract,
                        format!("Unknown user '{}'; pending notice not retracted", user_id),
                    ));
                }
            }
        }

        let results = join_all(targets.iter().map(|t| self.gateway.retract(t))).await;
        for (target, result) in targets.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    task_id = %task.id,
                    user = %target.user_id,
                    error = %e,
                    "Retraction failed; completion proceeds"
                );
                warnings.push(OrchestrationWarning::new(
                    WarningStage::Retract,
                    format!("Retraction for user '{}' failed: {}", target.user_id, e),
                ));
            }
        }
    }

    /// Resolve the next user-task nodes. Runs after the commit, so every
    /// failure is downgraded to a navigation warning.
    async fn next_nodes(
        &self,
        task: &TaskContext,
        variables: &VariableSet,
        warnings: &mut Vec<OrchestrationWarning>,
    ) -> Vec<FlowNode> {
        let result = async {
            let graph = self
                .graphs
                .get_or_load(&task.process_definition_id, self.engine.as_ref())
                .await?;
            self.navigator
                .next_user_task_nodes(&graph, &task.task_definition_key, variables)
        }
        .await;

        match result {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(
                    task_id = %task.id,
                    definition_id = %task.process_definition_id,
                    error = %e,
                    "Next-node resolution failed after commit; no notices issued"
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
    use crate::services::testkit::{
        form_with_approved, submission_approved, RecordingGateway, StubEngine, StubForms,
        StubIdentity,
    };

    fn orchestrator(
        engine: Arc<StubEngine>,
        forms: Arc<StubForms>,
        identity: Arc<StubIdentity>,
        gateway: Arc<RecordingGateway>,
    ) -> TaskCompletionOrchestrator {
        TaskCompletionOrchestrator::new(
            engine,
            forms,
            identity,
            gateway,
            Arc::new(GraphCache::new()),
        )
    }

    /// Review/sign scenario: task t1 (assignee alice, node review) routes
    /// to sign (assignee bob) when approved.
    fn review_sign_engine() -> StubEngine {
        StubEngine::new()
            .with_task(StubEngine::task("t1", "pi-1", "def-1", "review", "alice"))
            .with_model(
                "def-1",
                serde_json::json!({
                    "nodes": [
                        {"id": "review", "type": "userTask", "assignee": "alice"},
                        {"id": "gw", "type": "exclusiveGateway"},
                        {"id": "sign", "type": "userTask", "assignee": "bob"},
                        {"id": "end", "type": "endEvent"}
                    ],
                    "flows": [
                        {"source": "review", "target": "gw"},
                        {"source": "gw", "target": "sign", "condition": "approved == true"},
                        {"source": "gw", "target": "end", "condition": "approved == false"}
                    ]
                }),
            )
    }

    #[tokio::test]
    async fn test_complete_task_end_to_end() {
        let engine = Arc::new(review_sign_engine());
        let forms = Arc::new(StubForms::with_form(form_with_approved()));
        let identity = Arc::new(StubIdentity::with_users(&[
            ("alice", "Cooper", "Alice"),
            ("bob", "Baker", "Bob"),
        ]));
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine.clone(),
            forms.clone(),
            identity,
            gateway.clone(),
        );

        let outcome = orchestrator
            .complete_task("t1", &submission_approved(true), "alice")
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.task_id, "t1");
        assert_eq!(outcome.process_instance_id, "pi-1");
        assert_eq!(outcome.notified_nodes, vec!["sign"]);

        // Engine received the completion with the extracted variables
        let completions = engine.completions.lock().unwrap();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].0, "t1");
        assert_eq!(completions[0].1["approved"], serde_json::json!(true));

        // Old notice retracted for alice, new notice issued for bob
        let retracted = gateway.retracted.lock().unwrap();
        assert_eq!(retracted.len(), 1);
        assert_eq!(retracted[0].item_id, "t1");
        assert_eq!(retracted[0].user_id, "alice");
        assert_eq!(retracted[0].display_name, "CooperAlice");

        let issued = gateway.issued.lock().unwrap();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].item_id, "sign");
        assert_eq!(issued[0].user_id, "bob");
        assert_eq!(issued[0].display_name, "BakerBob");

        // Audit trail persisted
        assert_eq!(forms.stored.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_candidate_fan_out() {
        let engine = Arc::new(
            StubEngine::new()
                .with_task(StubEngine::task("t1", "pi-1", "def-1", "review", "alice"))
                .with_model(
                    "def-1",
                    serde_json::json!({
                        "nodes": [
                            {"id": "review", "type": "userTask"},
                            {"id": "approve", "type": "userTask",
                             "candidateUsers": ["bob", "carol", "bob"]}
                        ],
                        "flows": [{"source": "review", "target": "approve"}]
                    }),
                ),
        );
        let identity = Arc::new(StubIdentity::with_users(&[
            ("alice", "Cooper", "Alice"),
            ("bob", "Baker", "Bob"),
            ("carol", "Croft", "Carol"),
        ]));
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine,
            Arc::new(StubForms::with_form(form_with_approved())),
            identity,
            gateway.clone(),
        );

        let outcome = orchestrator
            .complete_task("t1", &submission_approved(true), "alice")
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());

        // One notice per candidate, duplicate candidate dropped
        let issued = gateway.issued.lock().unwrap();
        let users: Vec<&str> = issued.iter().map(|t| t.user_id.as_str()).collect();
        assert_eq!(users, vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn test_unauthorized_user_leaves_no_side_effects() {
        let engine = Arc::new(review_sign_engine());
        let gateway = Arc::new(RecordingGateway::new());
        let forms = Arc::new(StubForms::with_form(form_with_approved()));

        let orchestrator = orchestrator(
            engine.clone(),
            forms.clone(),
            Arc::new(StubIdentity::with_users(&[("alice", "Cooper", "Alice")])),
            gateway.clone(),
        );

        let result = orchestrator
            .complete_task("t1", &submission_approved(true), "mallory")
            .await;

        assert!(matches!(result, Err(AppError::NotPermitted(_))));
        assert!(engine.completions.lock().unwrap().is_empty());
        assert!(gateway.retracted.lock().unwrap().is_empty());
        assert!(gateway.issued.lock().unwrap().is_empty());
        assert!(forms.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_initiator_may_complete_when_permitted() {
        let mut task = StubEngine::task("t1", "pi-1", "def-1", "review", "alice");
        task.initiator_can_complete = true;
        let engine = Arc::new(
            review_sign_engine()
                .with_task(task)
                .with_initiator("pi-1", "dave"),
        );
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(StubForms::with_form(form_with_approved())),
            Arc::new(StubIdentity::with_users(&[
                ("alice", "Cooper", "Alice"),
                ("bob", "Baker", "Bob"),
            ])),
            gateway,
        );

        let outcome = orchestrator
            .complete_task("t1", &submission_approved(true), "dave")
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(engine.completions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retract_failure_does_not_block_completion() {
        let engine = Arc::new(review_sign_engine());
        let gateway = Arc::new(RecordingGateway::new().failing_retract());

        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(StubForms::with_form(form_with_approved())),
            Arc::new(StubIdentity::with_users(&[
                ("alice", "Cooper", "Alice"),
                ("bob", "Baker", "Bob"),
            ])),
            gateway.clone(),
        );

        let outcome = orchestrator
            .complete_task("t1", &submission_approved(true), "alice")
            .await
            .unwrap();

        assert_eq!(engine.completions.lock().unwrap().len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].stage, WarningStage::Retract);
        // Issuance still went out
        assert_eq!(gateway.issued.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_engine_rejection_is_fatal_and_stops_issuance() {
        let engine = Arc::new(review_sign_engine().failing_completion("task already completed"));
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine,
            Arc::new(StubForms::with_form(form_with_approved())),
            Arc::new(StubIdentity::with_users(&[
                ("alice", "Cooper", "Alice"),
                ("bob", "Baker", "Bob"),
            ])),
            gateway.clone(),
        );

        let result = orchestrator
            .complete_task("t1", &submission_approved(true), "alice")
            .await;

        assert!(matches!(result, Err(AppError::Engine(_))));
        // The retraction had already been dispatched, but nothing was issued
        assert_eq!(gateway.retracted.lock().unwrap().len(), 1);
        assert!(gateway.issued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_failure_degrades_to_warning() {
        // Task node id missing from the model: resolution fails post-commit
        let engine = Arc::new(
            StubEngine::new()
                .with_task(StubEngine::task("t1", "pi-1", "def-1", "ghost", "alice"))
                .with_model(
                    "def-1",
                    serde_json::json!({
                        "nodes": [{"id": "review", "type": "userTask"}],
                        "flows": []
                    }),
                ),
        );
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(StubForms::with_form(form_with_approved())),
            Arc::new(StubIdentity::with_users(&[("alice", "Cooper", "Alice")])),
            gateway.clone(),
        );

        let outcome = orchestrator
            .complete_task("t1", &submission_approved(true), "alice")
            .await
            .unwrap();

        // Completion committed, issuance skipped with a warning
        assert_eq!(engine.completions.lock().unwrap().len(), 1);
        assert!(gateway.issued.lock().unwrap().is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].stage, WarningStage::Navigation);
    }

    #[tokio::test]
    async fn test_unknown_next_user_is_skipped_with_warning() {
        let engine = Arc::new(review_sign_engine());
        let gateway = Arc::new(RecordingGateway::new());

        // bob is missing from the directory
        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(StubForms::with_form(form_with_approved())),
            Arc::new(StubIdentity::with_users(&[("alice", "Cooper", "Alice")])),
            gateway.clone(),
        );

        let outcome = orchestrator
            .complete_task("t1", &submission_approved(true), "alice")
            .await
            .unwrap();

        assert_eq!(engine.completions.lock().unwrap().len(), 1);
        assert!(gateway.issued.lock().unwrap().is_empty());
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.stage == WarningStage::Issue && w.message.contains("bob")));
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let orchestrator = orchestrator(
            Arc::new(StubEngine::new()),
            Arc::new(StubForms::with_form(form_with_approved())),
            Arc::new(StubIdentity::default()),
            Arc::new(RecordingGateway::new()),
        );

        let result = orchestrator
            .complete_task("ghost", &submission_approved(true), "alice")
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_form_key_mismatch() {
        let mut task = StubEngine::task("t1", "pi-1", "def-1", "review", "alice");
        task.form_key = Some("some-other-form".to_string());
        let engine = Arc::new(review_sign_engine().with_task(task));

        let orchestrator = orchestrator(
            engine,
            Arc::new(StubForms::with_form(form_with_approved())),
            Arc::new(StubIdentity::default()),
            Arc::new(RecordingGateway::new()),
        );

        let result = orchestrator
            .complete_task("t1", &submission_approved(true), "alice")
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_submission_aborts_before_mutation() {
        let engine = Arc::new(review_sign_engine());
        let gateway = Arc::new(RecordingGateway::new());

        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(StubForms::with_form(form_with_approved())),
            Arc::new(StubIdentity::with_users(&[("alice", "Cooper", "Alice")])),
            gateway.clone(),
        );

        let mut submission = submission_approved(true);
        submission
            .values
            .insert("rating".to_string(), serde_json::json!(5));

        let result = orchestrator.complete_task("t1", &submission, "alice").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(engine.completions.lock().unwrap().is_empty());
        assert!(gateway.retracted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_audit_failure_is_warning_only() {
        let engine = Arc::new(review_sign_engine());
        let forms = Arc::new(StubForms::with_form(form_with_approved()).failing_store());

        let orchestrator = orchestrator(
            engine.clone(),
            forms,
            Arc::new(StubIdentity::with_users(&[
                ("alice", "Cooper", "Alice"),
                ("bob", "Baker", "Bob"),
            ])),
            Arc::new(RecordingGateway::new()),
        );

        let outcome = orchestrator
            .complete_task("t1", &submission_approved(true), "alice")
            .await
            .unwrap();

        assert_eq!(engine.completions.lock().unwrap().len(), 1);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.stage == WarningStage::Audit));
    }
}
