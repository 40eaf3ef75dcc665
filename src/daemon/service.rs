// src/daemon/service.rs

//! The long-running monitor service.
//!
//! One async loop multiplexes three inputs: raw filesystem events from the
//! watcher channel, a periodic rediscovery tick, and shutdown signals.
//! Rediscovery re-scans the workflow directories, registers any newly
//! declared events and recomputes the directory watches, so workflows
//! added while the daemon runs get picked up without a restart.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::config::model::Config;
use crate::errors::Result;
use crate::events::monitor::{classify_event, dispatch_event, register_discovered, EventMonitor};
use crate::events::registry::EventRegistry;
use crate::events::trigger::FileSnapshot;
use crate::workflow::model::EventType;
use crate::workflow::registry::WorkflowRegistry;

/// Filesystem event monitor service run by the daemon.
pub struct MonitorService {
    config: Config,
}

impl MonitorService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<()> {
        info!("monitor service starting");
        self.config.ensure_directories()?;

        let mut workflows = WorkflowRegistry::new();
        workflows.discover(&self.config.workflow_dirs());

        let mut registry = EventRegistry::open(self.config.event_db_path())?;
        register_discovered(&workflows, &mut registry, &self.config);

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut monitor = EventMonitor::new(event_tx)?;
        monitor.setup_watches(&registry)?;

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {e}"))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {e}"))?;

        let mut rescan = interval(Duration::from_secs(self.config.monitor.check_interval.max(1)));
        rescan.tick().await;

        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    self.handle_event(&event, &workflows, &mut registry);
                }
                _ = rescan.tick() => {
                    debug!("rediscovering workflows");
                    workflows = WorkflowRegistry::new();
                    workflows.discover(&self.config.workflow_dirs());
                    register_discovered(&workflows, &mut registry, &self.config);
                    if let Err(err) = monitor.setup_watches(&registry) {
                        warn!(error = %err, "failed to refresh watches");
                    }
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    info!("received SIGINT, shutting down");
                    break;
                }
            }
        }

        info!("monitor service stopped");
        Ok(())
    }

    fn handle_event(
        &self,
        event: &notify::Event,
        workflows: &WorkflowRegistry,
        registry: &mut EventRegistry,
    ) {
        let Some(event_type) = classify_event(&event.kind) else {
            return;
        };

        for path in &event.paths {
            // Directory events carry no file to match against; deletions
            // are the exception since the path is all that survives.
            if event_type != EventType::FileDelete && path.is_dir() {
                continue;
            }

            let snapshot = if event_type == EventType::FileDelete {
                FileSnapshot::path_only(path)
            } else {
                match FileSnapshot::capture(path) {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        debug!(path = %path.display(), error = %err, "could not stat event path");
                        FileSnapshot::path_only(path)
                    }
                }
            };

            dispatch_event(event_type, &snapshot, workflows, registry, &self.config);
        }
    }
}
