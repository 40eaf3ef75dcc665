// src/config/model.rs

use std::path::PathBuf;

use clap::ValueEnum;
use serde::Deserialize;

/// Resolved configuration for LocalFlow.
///
/// Built by [`crate::config::loader::load_config`] from the YAML config file,
/// with every field falling back to a default when absent.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding globally installed workflows.
    pub workflows_dir: PathBuf,

    /// Project-local workflow directory, searched before `workflows_dir`.
    pub local_workflows_dir: PathBuf,

    /// Directory for log files and the event registry database.
    pub log_dir: PathBuf,

    /// Log level used when neither the CLI flag nor `LOCALFLOW_LOG` is set.
    pub log_level: String,

    /// Whether steps run through the container backend by default.
    ///
    /// A step with `local: true` always bypasses the container backend.
    pub container_enabled: bool,

    /// Default image for container execution.
    pub container_image: String,

    /// Echo step output to the console.
    pub show_output: bool,

    /// Shell used by the local command runner (`<shell> -c <command>`).
    pub default_shell: String,

    /// Workflow output routing.
    pub output: OutputConfig,

    /// The config file this was loaded from, if any.
    pub config_file: Option<PathBuf>,

    pub monitor: MonitorConfig,
}

/// Settings for the event monitor daemon.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// PID file enforcing single-instance daemon semantics.
    pub pid_file: PathBuf,

    /// Daemon log file; relative paths resolve under `log_dir`.
    pub log_file: PathBuf,

    /// Seconds between workflow rediscovery / watch recomputation passes.
    pub check_interval: u64,
}

/// Where workflow output is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Stdout,
    File,
    Both,
}

/// Configuration for workflow output handling.
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub file: Option<PathBuf>,
    pub mode: OutputMode,
    pub append: bool,
}

impl Config {
    /// Default configuration rooted under `~/.localflow`.
    pub fn defaults() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let base = home.join(".localflow");

        Self {
            workflows_dir: base.join("workflows"),
            local_workflows_dir: PathBuf::from(".localflow"),
            log_dir: base.join("logs"),
            log_level: "info".to_string(),
            container_enabled: false,
            container_image: "ubuntu:latest".to_string(),
            show_output: true,
            default_shell: "/bin/bash".to_string(),
            output: OutputConfig::default(),
            config_file: None,
            monitor: MonitorConfig::defaults(),
        }
    }

    /// Directories searched for workflows, local first.
    pub fn workflow_dirs(&self) -> Vec<PathBuf> {
        vec![self.local_workflows_dir.clone(), self.workflows_dir.clone()]
    }

    /// Absolute path of the daemon log file.
    pub fn monitor_log_path(&self) -> PathBuf {
        if self.monitor.log_file.is_absolute() {
            self.monitor.log_file.clone()
        } else {
            self.log_dir.join(&self.monitor.log_file)
        }
    }

    /// Path of the persistent event registry database.
    pub fn event_db_path(&self) -> PathBuf {
        self.log_dir.join("events.json")
    }

    /// Ensure the workflow and log directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.workflows_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

impl MonitorConfig {
    pub fn defaults() -> Self {
        Self {
            pid_file: PathBuf::from("/tmp/localflow-monitor.pid"),
            log_file: PathBuf::from("localflow-monitor.log"),
            check_interval: 60,
        }
    }
}
