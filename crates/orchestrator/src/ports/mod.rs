//! Ports to the external collaborators.
//!
//! The process engine, form repository, and identity directory are
//! consumed through async traits so orchestrators can be wired with the
//! REST clients in production and with in-memory doubles in tests.

pub mod forms;
pub mod identity;
pub mod process_engine;

pub use forms::FormRepository;
pub use identity::{IdentityDirectory, User};
pub use process_engine::{ProcessDefinitionMeta, ProcessEngine, ProcessInstanceSummary, TaskContext};
