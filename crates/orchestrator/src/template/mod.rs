//! Template rendering module.
//!
//! Provides Jinja2-style expression evaluation for sequence-flow conditions.

pub mod jinja;

pub use jinja::TemplateRenderer;
