// src/workflow/registry.rs

//! Workflow discovery and lookup.
//!
//! Discovery walks the given directories for `*.yml` / `*.yaml` files,
//! assigns any missing ids (persisting them back into the file exactly
//! once), and registers the parsed workflows. Directories are searched in
//! argument order and the first workflow registered under an id wins, so
//! callers pass the local directory before the global one for local-first
//! precedence.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::errors::{LocalFlowError, Result};
use crate::workflow::ids::generate_id;
use crate::workflow::model::Workflow;

/// Registry of available workflows, keyed by id.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: HashMap<String, Workflow>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover workflows under each directory, earlier directories taking
    /// precedence on id collisions.
    ///
    /// Files that fail to load are logged and skipped so one broken file
    /// does not hide the rest.
    pub fn discover(&mut self, directories: &[PathBuf]) {
        for directory in directories {
            if !directory.is_dir() {
                continue;
            }
            for path in workflow_files(directory) {
                match load_workflow(&path) {
                    Ok(workflow) => {
                        self.workflows
                            .entry(workflow.id.clone())
                            .or_insert(workflow);
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping workflow");
                    }
                }
            }
        }
    }

    /// Exact lookup by id.
    pub fn get(&self, workflow_id: &str) -> Option<&Workflow> {
        self.workflows.get(workflow_id)
    }

    /// Lookup by id, with a fallback to the normalised workflow name. Used
    /// when resolving event registrations.
    pub fn resolve(&self, identifier: &str) -> Option<&Workflow> {
        self.workflows.get(identifier).or_else(|| {
            self.workflows
                .values()
                .find(|w| w.normalized_name() == identifier)
        })
    }

    /// Workflows carrying all of `tags` (or every workflow when `None`),
    /// sorted by name for deterministic output.
    pub fn find(&self, tags: Option<&BTreeSet<String>>) -> Vec<&Workflow> {
        let mut matches: Vec<&Workflow> = self
            .workflows
            .values()
            .filter(|w| match tags {
                Some(tags) if !tags.is_empty() => tags.is_subset(&w.tags),
                _ => true,
            })
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }
}

fn workflow_files(directory: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(directory) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yml" || e == "yaml");
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    files
}

fn load_workflow(path: &Path) -> Result<Workflow> {
    ensure_ids(path)?;
    Workflow::from_path(path)
}

/// Assign missing workflow/job ids in the raw YAML and write the file back
/// if anything changed. Existing ids are never re-derived.
pub fn ensure_ids(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)?;
    let mut doc: Value = serde_yaml::from_str(&text)?;

    let Some(map) = doc.as_mapping_mut() else {
        return Err(LocalFlowError::Other(anyhow!(
            "invalid workflow format in {}",
            path.display()
        )));
    };

    let mut modified = false;

    let workflow_id = match map.get("id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => {
            let id = generate_id("wf", &path.display().to_string());
            map.insert(Value::from("id"), Value::from(id.clone()));
            modified = true;
            id
        }
    };

    if let Some(jobs) = map.get_mut("jobs").and_then(Value::as_mapping_mut) {
        for (name, job) in jobs.iter_mut() {
            if job.is_null() {
                *job = Value::Mapping(Default::default());
            }
            let Some(job_map) = job.as_mapping_mut() else {
                continue;
            };
            if !job_map.contains_key("id") {
                let job_name = name.as_str().unwrap_or_default();
                let id = generate_id("job", &format!("{workflow_id}_{job_name}"));
                job_map.insert(Value::from("id"), Value::from(id));
                modified = true;
            }
        }
    }

    if modified {
        debug!(path = %path.display(), "persisting generated ids");
        std::fs::write(path, serde_yaml::to_string(&doc)?)?;
    }

    Ok(())
}
