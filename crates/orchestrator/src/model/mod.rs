//! Process model types for the orchestrator.
//!
//! - [`graph`]: immutable process definition graphs (nodes + sequence flows)
//! - [`parser`]: parse and validate engine-exported process model JSON
//! - [`forms`]: form definitions and submission-to-variables extraction
//! - [`cache`]: shared read-mostly cache of parsed graphs

pub mod cache;
pub mod forms;
pub mod graph;
pub mod parser;

use std::collections::HashMap;

pub use cache::GraphCache;
pub use forms::{FormDefinition, FormField, FormSubmission};
pub use graph::{FlowNode, NodeKind, ProcessDefinitionGraph, SequenceFlow};

/// Variables extracted from a form submission and fed to the engine and
/// to flow-condition evaluation. Built fresh per request, never mutated
/// after extraction.
pub type VariableSet = HashMap<String, serde_json::Value>;
