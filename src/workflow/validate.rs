// src/workflow/validate.rs

//! Workflow validation.
//!
//! Validation reports reference errors before any execution is attempted.
//! Condition references come from the declared `needs` list when present,
//! otherwise from parsing the expression itself. Dependency cycles are
//! deliberately not detected here: a condition may render a cyclic-looking
//! reference unreachable, so cycle detection is deferred to execution time.

use std::collections::BTreeSet;

use crate::condition;
use crate::workflow::model::{Condition, Workflow};

impl Workflow {
    /// Validate the workflow, returning human-readable error messages
    /// (empty when valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.jobs.is_empty() {
            errors.push("Workflow must contain at least one job".to_string());
        }

        let job_ids: BTreeSet<&str> = self.jobs.values().map(|j| j.id.as_str()).collect();

        for job in self.jobs.values() {
            for needed in &job.needs {
                if !job_ids.contains(needed.as_str()) {
                    errors.push(format!(
                        "Job '{}' references unknown job ID '{}'",
                        job.name, needed
                    ));
                }
            }

            if let Some(condition) = &job.condition {
                for reference in condition_references(condition) {
                    if !job_ids.contains(reference.as_str()) {
                        errors.push(format!(
                            "Job '{}' condition references unknown job ID '{}'",
                            job.name, reference
                        ));
                    }
                }
            }
        }

        errors
    }
}

/// References to check for a condition: the declared set when given,
/// otherwise the identifiers parsed out of the expression. A malformed
/// expression yields nothing here; it fails at evaluation time instead.
fn condition_references(condition: &Condition) -> Vec<String> {
    if !condition.references.is_empty() {
        return condition.references.iter().cloned().collect();
    }
    condition::parse(&condition.expression)
        .map(|expr| {
            expr.references()
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
