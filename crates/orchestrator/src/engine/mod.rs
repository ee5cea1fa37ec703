//! Process graph traversal engine.
//!
//! - **Navigator**: finds the user-task nodes reachable from a completed
//!   node, following conditional sequence flows
//! - **Evaluator**: decides whether a sequence flow is enabled for a
//!   given variable set

pub mod evaluator;
pub mod navigator;

pub use evaluator::ConditionEvaluator;
pub use navigator::ProcessGraphNavigator;
