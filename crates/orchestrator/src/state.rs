//! Application state for the FlowSync orchestrator.
//!
//! Shared state passed to all handlers via Axum's state management.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{ProcessStartOrchestrator, TaskCompletionOrchestrator, TaskFormService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Task completion orchestrator
    pub completion: Arc<TaskCompletionOrchestrator>,

    /// Process start orchestrator
    pub start: Arc<ProcessStartOrchestrator>,

    /// Task form / variable queries
    pub task_forms: Arc<TaskFormService>,

    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: AppConfig,
        completion: TaskCompletionOrchestrator,
        start: ProcessStartOrchestrator,
        task_forms: TaskFormService,
    ) -> Self {
        Self {
            config: Arc::new(config),
            completion: Arc::new(completion),
            start: Arc::new(start),
            task_forms: Arc::new(task_forms),
            start_time: std::time::Instant::now(),
        }
    }

    /// Get the server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
