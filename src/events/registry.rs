// src/events/registry.rs

//! Persistent event registration registry.
//!
//! Registrations are stored as versioned JSON and written atomically
//! (temp file then rename), so a crash mid-save never leaves a corrupt
//! database. Registration ids derive from workflow id and event type, which
//! makes re-registering a discovered workflow idempotent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{LocalFlowError, Result};
use crate::workflow::ids::generate_id;
use crate::workflow::model::{EventSpec, EventTrigger, EventType, Workflow};

/// On-disk format version currently written and accepted.
pub const REGISTRY_FORMAT_VERSION: u32 = 1;

/// Where the owning workflow was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Local,
    Global,
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventSource::Local => "local",
            EventSource::Global => "global",
        })
    }
}

/// One registered event binding a workflow to a filesystem trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRegistration {
    pub id: String,
    pub workflow_id: String,
    pub event_type: EventType,
    pub trigger: EventTrigger,
    pub source: EventSource,
    #[serde(default)]
    pub job_ids: Option<Vec<String>>,
    pub enabled: bool,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

impl EventRegistration {
    /// Build a registration from a workflow's event declaration. The id is
    /// stable for a given workflow and event type.
    pub fn from_spec(workflow_id: &str, spec: &EventSpec, source: EventSource) -> Self {
        Self {
            id: generate_id("evt", &format!("{workflow_id}_{}", spec.event_type)),
            workflow_id: workflow_id.to_string(),
            event_type: spec.event_type,
            trigger: spec.trigger.clone(),
            source,
            job_ids: spec.job_ids.clone(),
            enabled: true,
            registered_at: Utc::now(),
            last_triggered: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    registrations: BTreeMap<String, EventRegistration>,
}

/// Event registration store backed by one JSON file.
#[derive(Debug)]
pub struct EventRegistry {
    db_file: PathBuf,
    registrations: BTreeMap<String, EventRegistration>,
}

impl EventRegistry {
    /// Open the registry at `db_file`, loading existing registrations. A
    /// missing file is an empty registry; an unsupported format version is
    /// an error rather than silent data loss.
    pub fn open(db_file: PathBuf) -> Result<Self> {
        let registrations = if db_file.exists() {
            let text = std::fs::read_to_string(&db_file)?;
            let file: RegistryFile = serde_json::from_str(&text)?;
            if file.version != REGISTRY_FORMAT_VERSION {
                return Err(LocalFlowError::UnsupportedRegistryVersion(file.version));
            }
            info!(
                db = %db_file.display(),
                count = file.registrations.len(),
                "loaded event registrations"
            );
            file.registrations
        } else {
            debug!(db = %db_file.display(), "no event registration database yet");
            BTreeMap::new()
        };

        Ok(Self {
            db_file,
            registrations,
        })
    }

    /// Register every event a workflow declares. Returns the ids that were
    /// newly added; already-known registrations keep their state untouched.
    pub fn register_workflow(
        &mut self,
        workflow: &Workflow,
        source: EventSource,
    ) -> Result<Vec<String>> {
        let mut added = Vec::new();
        for spec in &workflow.events {
            let reg = EventRegistration::from_spec(&workflow.id, spec, source);
            if self.registrations.contains_key(&reg.id) {
                debug!(event = %reg.id, workflow = %workflow.id, "already registered");
                continue;
            }
            info!(event = %reg.id, workflow = %workflow.id, event_type = %reg.event_type, "registered event");
            added.push(reg.id.clone());
            self.registrations.insert(reg.id.clone(), reg);
        }
        if !added.is_empty() {
            self.save()?;
        }
        Ok(added)
    }

    /// Remove every registration belonging to a workflow. Returns the
    /// removed ids.
    pub fn unregister_workflow(&mut self, workflow_id: &str) -> Result<Vec<String>> {
        let removed: Vec<String> = self
            .registrations
            .values()
            .filter(|r| r.workflow_id == workflow_id)
            .map(|r| r.id.clone())
            .collect();
        for id in &removed {
            self.registrations.remove(id);
            info!(event = %id, workflow = %workflow_id, "unregistered event");
        }
        if !removed.is_empty() {
            self.save()?;
        }
        Ok(removed)
    }

    /// Enable a registration. Returns false when the id is unknown.
    pub fn enable(&mut self, event_id: &str) -> Result<bool> {
        self.set_enabled(event_id, true)
    }

    /// Disable a registration. Returns false when the id is unknown.
    pub fn disable(&mut self, event_id: &str) -> Result<bool> {
        self.set_enabled(event_id, false)
    }

    fn set_enabled(&mut self, event_id: &str, enabled: bool) -> Result<bool> {
        match self.registrations.get_mut(event_id) {
            Some(reg) => {
                reg.enabled = enabled;
                self.save()?;
                info!(event = %event_id, enabled, "updated event state");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get(&self, event_id: &str) -> Option<&EventRegistration> {
        self.registrations.get(event_id)
    }

    /// Registrations filtered by source, workflow and enabled state, sorted
    /// by registration time.
    pub fn list(
        &self,
        source: Option<EventSource>,
        workflow_id: Option<&str>,
        enabled_only: bool,
    ) -> Vec<&EventRegistration> {
        let mut regs: Vec<&EventRegistration> = self
            .registrations
            .values()
            .filter(|r| source.is_none_or(|s| r.source == s))
            .filter(|r| workflow_id.is_none_or(|w| r.workflow_id == w))
            .filter(|r| !enabled_only || r.enabled)
            .collect();
        regs.sort_by_key(|r| r.registered_at);
        regs
    }

    /// Stamp a registration's last-triggered time.
    pub fn record_trigger(&mut self, event_id: &str) -> Result<()> {
        if let Some(reg) = self.registrations.get_mut(event_id) {
            reg.last_triggered = Some(Utc::now());
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.db_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = RegistryFile {
            version: REGISTRY_FORMAT_VERSION,
            registrations: self.registrations.clone(),
        };
        let tmp = tmp_path(&self.db_file);
        std::fs::write(&tmp, serde_json::to_string_pretty(&file)?)?;
        std::fs::rename(&tmp, &self.db_file)?;
        debug!(db = %self.db_file.display(), count = self.registrations.len(), "saved event registrations");
        Ok(())
    }
}

fn tmp_path(db_file: &Path) -> PathBuf {
    let mut name = db_file.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    db_file.with_file_name(name)
}
