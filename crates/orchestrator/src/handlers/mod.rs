//! HTTP handlers for the FlowSync orchestrator API.
//!
//! Handlers validate the request shape, delegate to the service layer,
//! and let `AppError` map failures to responses.

pub mod health;
pub mod process_instances;
pub mod tasks;

pub use health::{api_health, health_check};
pub use process_instances::{query_instance_by_task, start_instance};
pub use tasks::{complete_task, task_form, task_variables};
