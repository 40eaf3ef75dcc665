// src/workflow/model.rs

//! Typed workflow model and its YAML file representation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::condition;
use crate::errors::{LocalFlowError, Result};

/// A complete workflow loaded from one YAML definition file.
#[derive(Debug, Clone)]
pub struct Workflow {
    /// Stable content-derived id. Immutable once assigned.
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub author: Option<String>,
    pub tags: BTreeSet<String>,
    /// Workflow-level environment, applied to every job.
    pub env: BTreeMap<String, String>,
    /// Jobs keyed by name. Insertion order is irrelevant; execution order is
    /// driven by `needs`.
    pub jobs: BTreeMap<String, Job>,
    /// Declared event triggers, in file order.
    pub events: Vec<EventSpec>,
    /// Path of the definition file this workflow was loaded from.
    pub source: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// A unit of sequential steps within a workflow.
#[derive(Debug, Clone)]
pub struct Job {
    /// Stable id, scoped to the owning workflow.
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    /// Optional run condition over job-completion state.
    pub condition: Option<Condition>,
    pub steps: Vec<Step>,
    pub env: BTreeMap<String, String>,
    /// Ids of jobs that must complete before this one runs.
    pub needs: BTreeSet<String>,
}

/// A single shell command within a job.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,

    /// The command to execute. A step without one is a configuration error
    /// that fails the job at execution time.
    #[serde(default)]
    pub run: Option<String>,

    #[serde(default, alias = "working-directory")]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Run locally even when the container backend is enabled.
    #[serde(default)]
    pub local: bool,
}

impl Step {
    /// Display name for logs and error messages.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed step")
    }
}

/// A job execution condition: a restricted boolean expression over job ids,
/// plus the explicitly declared reference set used for pre-validation.
#[derive(Debug, Clone)]
pub struct Condition {
    pub expression: String,
    pub references: BTreeSet<String>,
}

/// Condition as written in YAML: a bare string/bool, or a mapping with an
/// `if` expression and a `needs` reference list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    Literal(bool),
    Expression(String),
    Guarded {
        #[serde(rename = "if")]
        expression: String,
        #[serde(default)]
        needs: Vec<String>,
    },
}

impl Condition {
    pub fn from_spec(spec: ConditionSpec) -> Self {
        match spec {
            ConditionSpec::Literal(value) => Self {
                expression: value.to_string(),
                references: BTreeSet::new(),
            },
            ConditionSpec::Expression(expression) => Self {
                expression,
                references: BTreeSet::new(),
            },
            ConditionSpec::Guarded { expression, needs } => Self {
                expression,
                references: needs.into_iter().collect(),
            },
        }
    }

    /// Evaluate against a job-completion context.
    ///
    /// Ids absent from `context` are undefined and fail evaluation
    /// explicitly rather than defaulting to false.
    pub fn evaluate(&self, context: &HashMap<String, bool>) -> Result<bool> {
        condition::evaluate(&self.expression, context).map_err(|e| {
            LocalFlowError::ConditionEvaluation {
                expression: self.expression.clone(),
                reason: e.to_string(),
            }
        })
    }
}

/// Logical file-system event classes a registration can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FileChange,
    FileCreate,
    FileDelete,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::FileChange => "file_change",
            EventType::FileCreate => "file_create",
            EventType::FileDelete => "file_delete",
        };
        f.write_str(name)
    }
}

/// One declared event in a workflow's `events` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSpec {
    #[serde(rename = "type")]
    pub event_type: EventType,

    pub trigger: EventTrigger,

    /// Restrict triggered execution to these jobs, in order. `None` runs the
    /// whole workflow.
    #[serde(default)]
    pub job_ids: Option<Vec<String>>,
}

/// File-system trigger configuration. Holds no mutable match state; matching
/// is evaluated against a metadata snapshot captured at event time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTrigger {
    /// Directories to watch.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Filename patterns: each compiled as regex, falling back to a
    /// glob-to-regex translation if the pattern is not valid regex.
    #[serde(default)]
    pub patterns: Vec<String>,

    #[serde(default)]
    pub recursive: bool,

    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Path globs the file must match (at least one, when non-empty).
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Path globs the file must not match.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub group: Option<String>,

    /// Size bounds in bytes, inclusive.
    #[serde(default)]
    pub min_size: Option<u64>,

    #[serde(default)]
    pub max_size: Option<u64>,
}

/// Raw YAML shape of a workflow file.
#[derive(Debug, Deserialize)]
struct WorkflowFile {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    version: Option<String>,
    author: Option<String>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    jobs: BTreeMap<String, JobFile>,
    #[serde(default)]
    events: Vec<EventSpec>,
}

#[derive(Debug, Deserialize)]
struct JobFile {
    id: Option<String>,
    description: Option<String>,
    #[serde(default)]
    tags: BTreeSet<String>,
    condition: Option<ConditionSpec>,
    #[serde(default)]
    steps: Vec<Step>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    needs: BTreeSet<String>,
}

impl Workflow {
    /// Load a workflow from its definition file, using the stored ids.
    ///
    /// Files are expected to have gone through id assignment first
    /// ([`crate::workflow::registry::ensure_ids`]); a missing workflow or
    /// job id is an error here.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let file: WorkflowFile = serde_yaml::from_str(&text)?;

        let id = file.id.ok_or_else(|| {
            LocalFlowError::Other(anyhow!(
                "workflow in {} is missing required id",
                path.display()
            ))
        })?;

        let name = file.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| id.clone())
        });

        let mut jobs = BTreeMap::new();
        for (job_name, job) in file.jobs {
            let job_id = job.id.ok_or_else(|| {
                LocalFlowError::Other(anyhow!(
                    "job '{}' in {} is missing required id",
                    job_name,
                    path.display()
                ))
            })?;
            jobs.insert(
                job_name.clone(),
                Job {
                    id: job_id,
                    name: job_name,
                    description: job.description,
                    tags: job.tags,
                    condition: job.condition.map(Condition::from_spec),
                    steps: job.steps,
                    env: job.env,
                    needs: job.needs,
                },
            );
        }

        let meta = std::fs::metadata(path).ok();
        let created_at = meta
            .as_ref()
            .and_then(|m| m.created().ok())
            .map(DateTime::<Utc>::from);
        let modified_at = meta
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        Ok(Workflow {
            id,
            name,
            description: file.description,
            version: file.version.unwrap_or_else(|| "1.0.0".to_string()),
            author: file.author,
            tags: file.tags,
            env: file.env,
            jobs,
            events: file.events,
            source: path.to_path_buf(),
            created_at,
            modified_at,
        })
    }

    /// Find a job by id, falling back to lookup by name.
    pub fn job(&self, identifier: &str) -> Option<&Job> {
        self.jobs
            .values()
            .find(|j| j.id == identifier)
            .or_else(|| self.jobs.get(identifier))
    }

    /// Name normalised the way event registrations may reference it
    /// (lowercase, spaces replaced with underscores).
    pub fn normalized_name(&self) -> String {
        self.name.to_lowercase().replace(' ', "_")
    }
}
