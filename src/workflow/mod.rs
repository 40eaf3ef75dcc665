// src/workflow/mod.rs

//! Workflow model: YAML parsing, stable id assignment, discovery and
//! validation.

pub mod ids;
pub mod model;
pub mod registry;
pub mod validate;

pub use ids::generate_id;
pub use model::{Condition, EventSpec, EventTrigger, EventType, Job, Step, Workflow};
pub use registry::WorkflowRegistry;
