// src/events/monitor.rs

//! Filesystem event monitor.
//!
//! The monitor owns a `notify` watcher whose blocking callback forwards raw
//! events over an unbounded channel into the async daemon loop. Watches are
//! recomputed from the enabled registrations: one watch per distinct
//! directory, recursive when any registration watching it asks for
//! recursion.

use std::collections::HashMap;
use std::path::PathBuf;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::model::Config;
use crate::errors::Result;
use crate::events::registry::{EventRegistry, EventSource};
use crate::events::trigger::FileSnapshot;
use crate::exec::executor::WorkflowExecutor;
use crate::workflow::model::EventType;
use crate::workflow::registry::WorkflowRegistry;

/// Watches trigger directories and dispatches matching events to workflow
/// execution.
pub struct EventMonitor {
    watcher: RecommendedWatcher,
    /// Currently active watches: directory to recursive flag.
    watched: HashMap<PathBuf, bool>,
}

impl EventMonitor {
    /// Create a monitor forwarding raw notify events into `event_tx`.
    pub fn new(event_tx: mpsc::UnboundedSender<Event>) -> Result<Self> {
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        warn!(error = %err, "failed to forward watch event");
                    }
                }
                Err(err) => {
                    error!(error = %err, "file watch error");
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| anyhow::anyhow!("failed to create file watcher: {e}"))?;

        Ok(Self {
            watcher,
            watched: HashMap::new(),
        })
    }

    /// Recompute watches from the enabled registrations, adding new
    /// directories and dropping ones no longer referenced. A directory
    /// watched by several registrations is recursive when any of them is.
    pub fn setup_watches(&mut self, registry: &EventRegistry) -> Result<()> {
        let mut desired: HashMap<PathBuf, bool> = HashMap::new();
        for reg in registry.list(None, None, true) {
            for path in &reg.trigger.paths {
                let expanded = PathBuf::from(shellexpand::tilde(path).into_owned());
                if !expanded.exists() {
                    debug!(path = %expanded.display(), "watch path does not exist, skipping");
                    continue;
                }
                let entry = desired.entry(expanded).or_insert(false);
                *entry = *entry || reg.trigger.recursive;
            }
        }

        let stale: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|(path, recursive)| desired.get(*path) != Some(recursive))
            .map(|(path, _)| path.clone())
            .collect();
        for path in stale {
            if let Err(err) = self.watcher.unwatch(&path) {
                warn!(path = %path.display(), error = %err, "failed to remove watch");
            }
            self.watched.remove(&path);
        }

        for (path, recursive) in desired {
            if self.watched.contains_key(&path) {
                continue;
            }
            let mode = if recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            match self.watcher.watch(&path, mode) {
                Ok(()) => {
                    info!(path = %path.display(), recursive, "watching");
                    self.watched.insert(path, recursive);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to watch");
                }
            }
        }

        Ok(())
    }

    /// Currently watched directories and their recursion flags.
    pub fn watched(&self) -> &HashMap<PathBuf, bool> {
        &self.watched
    }
}

/// Map a raw notify event onto a logical event type. Access and metadata
/// events carry no trigger semantics and map to `None`.
pub fn classify_event(kind: &EventKind) -> Option<EventType> {
    match kind {
        EventKind::Create(_) => Some(EventType::FileCreate),
        EventKind::Modify(_) => Some(EventType::FileChange),
        EventKind::Remove(_) => Some(EventType::FileDelete),
        _ => None,
    }
}

/// Run every enabled registration matching `event_type` and `snapshot`.
///
/// The registration's workflow resolves by id first, then by normalised
/// name. Trigger times are recorded whenever dispatch itself succeeded,
/// even if some triggered job failed.
pub fn dispatch_event(
    event_type: EventType,
    snapshot: &FileSnapshot,
    workflows: &WorkflowRegistry,
    registry: &mut EventRegistry,
    config: &Config,
) {
    let matching: Vec<(String, String, Option<Vec<String>>)> = registry
        .list(None, None, true)
        .into_iter()
        .filter(|reg| reg.event_type == event_type)
        .filter(|reg| reg.trigger.matches(snapshot))
        .map(|reg| (reg.id.clone(), reg.workflow_id.clone(), reg.job_ids.clone()))
        .collect();

    for (reg_id, workflow_id, job_ids) in matching {
        info!(
            event = %reg_id,
            event_type = %event_type,
            path = %snapshot.path.display(),
            "event triggered"
        );

        let Some(workflow) = workflows.resolve(&workflow_id) else {
            error!(workflow = %workflow_id, event = %reg_id, "workflow not found for event");
            continue;
        };

        let run = || -> Result<bool> {
            let mut executor = WorkflowExecutor::new(workflow.clone(), config.clone())?;
            match &job_ids {
                Some(ids) => executor.execute_jobs(ids),
                None => executor.run(),
            }
        };

        match run() {
            Ok(ok) => {
                if !ok {
                    warn!(workflow = %workflow.id, event = %reg_id, "triggered workflow reported failures");
                }
                if let Err(err) = registry.record_trigger(&reg_id) {
                    warn!(event = %reg_id, error = %err, "failed to record trigger time");
                }
            }
            Err(err) => {
                error!(workflow = %workflow.id, event = %reg_id, error = %err, "error executing triggered workflow");
            }
        }
    }
}

/// Register events from every discovered workflow, classifying each as
/// local or global by where its definition file lives.
pub fn register_discovered(
    workflows: &WorkflowRegistry,
    registry: &mut EventRegistry,
    config: &Config,
) {
    for workflow in workflows.find(None) {
        let source = if workflow.source.starts_with(&config.local_workflows_dir) {
            EventSource::Local
        } else {
            EventSource::Global
        };
        if let Err(err) = registry.register_workflow(workflow, source) {
            warn!(workflow = %workflow.id, error = %err, "failed to register workflow events");
        }
    }
}
