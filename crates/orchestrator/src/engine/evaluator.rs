//! Sequence-flow condition evaluation.

use crate::error::AppResult;
use crate::model::{SequenceFlow, VariableSet};
use crate::template::TemplateRenderer;

/// Evaluates whether sequence flows are enabled for a variable set.
///
/// A flow with no condition is always enabled. A condition referencing a
/// variable absent from the set evaluates to false, pruning that branch
/// instead of failing the traversal.
pub struct ConditionEvaluator {
    renderer: TemplateRenderer,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self {
            renderer: TemplateRenderer::new(),
        }
    }

    /// Whether the flow may be taken under the given variables.
    pub fn flow_enabled(&self, flow: &SequenceFlow, variables: &VariableSet) -> AppResult<bool> {
        match &flow.condition {
            None => Ok(true),
            Some(expr) => self.renderer.evaluate_condition(expr, variables),
        }
    }
}
