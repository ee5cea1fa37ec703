//! Shared cache of parsed process definition graphs.
//!
//! Graphs are immutable once parsed, so a single `Arc` per definition id
//! is shared across all concurrent orchestrations. The read path takes
//! only the shared lock; a miss loads and parses the model *without*
//! holding the write lock, so readers of already-cached graphs are never
//! blocked behind a slow engine fetch. Two concurrent misses for the
//! same id may both load; the second insert is discarded.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::model::graph::ProcessDefinitionGraph;
use crate::model::parser::parse_process_model;
use crate::ports::ProcessEngine;

/// Cache of process definition graphs keyed by definition id.
#[derive(Default)]
pub struct GraphCache {
    inner: RwLock<HashMap<String, Arc<ProcessDefinitionGraph>>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the graph for a definition, loading and parsing it through the
    /// engine port on a miss.
    pub async fn get_or_load(
        &self,
        definition_id: &str,
        engine: &dyn ProcessEngine,
    ) -> AppResult<Arc<ProcessDefinitionGraph>> {
        if let Some(graph) = self.inner.read().await.get(definition_id) {
            return Ok(graph.clone());
        }

        let model = engine
            .model_json(definition_id)
            .await?
            .ok_or_else(|| {
                AppError::Graph(format!(
                    "Process model not found for definition: {}",
                    definition_id
                ))
            })?;

        let graph = Arc::new(parse_process_model(definition_id, &model)?);
        debug!(
            definition_id = %definition_id,
            nodes = graph.node_count(),
            "Parsed process definition graph"
        );

        let mut cache = self.inner.write().await;
        Ok(cache
            .entry(definition_id.to_string())
            .or_insert(graph)
            .clone())
    }

    /// Number of cached graphs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
