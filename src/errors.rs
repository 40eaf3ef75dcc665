// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalFlowError {
    /// Workflow failed validation before any execution was attempted.
    #[error("workflow validation failed:\n{}", format_errors(.0))]
    Validation(Vec<String>),

    /// A job's dependency chain returned to a job already on the active
    /// execution path. Carries the full offending chain.
    #[error("circular dependency detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// A `needs` reference pointed at a job that does not exist in the
    /// workflow. Validation catches this first; this is the runtime backstop.
    #[error("dependency job '{0}' not found")]
    DependencyNotFound(String),

    #[error("job '{0}' not found")]
    JobNotFound(String),

    #[error("workflow '{0}' not found")]
    WorkflowNotFound(String),

    /// Malformed condition expression, or a reference to a job id that is
    /// undefined in the evaluation context.
    #[error("failed to evaluate condition '{expression}': {reason}")]
    ConditionEvaluation { expression: String, reason: String },

    #[error("unsupported event registry format version {0}")]
    UnsupportedRegistryVersion(u32),

    #[error("daemon is already running (pid {0})")]
    AlreadyRunning(i32),

    #[error("daemon is not running")]
    NotRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_errors(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, LocalFlowError>;
