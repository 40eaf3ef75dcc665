// src/config/loader.rs

//! Config file loading.
//!
//! The config file is YAML; every field is optional and falls back to the
//! defaults in [`Config::defaults`]. Path fields support `~` expansion.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::config::model::{Config, MonitorConfig, OutputConfig, OutputMode};
use crate::errors::Result;

/// Raw config file shape, before defaults are applied.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    workflows_dir: Option<String>,
    local_workflows_dir: Option<String>,
    log_dir: Option<String>,
    log_level: Option<String>,
    container_enabled: Option<bool>,
    container_image: Option<String>,
    show_output: Option<bool>,
    default_shell: Option<String>,
    #[serde(default)]
    output: RawOutput,
    #[serde(default)]
    monitor: RawMonitor,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    file: Option<String>,
    mode: Option<OutputMode>,
    append: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMonitor {
    pid_file: Option<String>,
    log_file: Option<String>,
    check_interval: Option<u64>,
}

/// Load configuration, resolving the file path in this order:
/// explicit `--config` flag, `LOCALFLOW_CONFIG`, `~/.localflow/config.yml`.
///
/// A missing file yields the defaults; a malformed file is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = resolve_config_path(explicit);

    let raw = match &path {
        Some(p) if p.exists() => {
            let text = std::fs::read_to_string(p)?;
            serde_yaml::from_str::<RawConfig>(&text)?
        }
        _ => {
            debug!("no config file found; using defaults");
            RawConfig::default()
        }
    };

    let defaults = Config::defaults();
    let monitor_defaults = MonitorConfig::defaults();

    Ok(Config {
        workflows_dir: expand_or(raw.workflows_dir, defaults.workflows_dir),
        local_workflows_dir: expand_or(raw.local_workflows_dir, defaults.local_workflows_dir),
        log_dir: expand_or(raw.log_dir, defaults.log_dir),
        log_level: raw.log_level.unwrap_or(defaults.log_level),
        container_enabled: raw.container_enabled.unwrap_or(defaults.container_enabled),
        container_image: raw.container_image.unwrap_or(defaults.container_image),
        show_output: raw.show_output.unwrap_or(defaults.show_output),
        default_shell: raw.default_shell.unwrap_or(defaults.default_shell),
        output: OutputConfig {
            file: raw.output.file.map(|f| expand(&f)),
            mode: raw.output.mode.unwrap_or_default(),
            append: raw.output.append.unwrap_or(false),
        },
        config_file: path.filter(|p| p.exists()),
        monitor: MonitorConfig {
            pid_file: expand_or(raw.monitor.pid_file, monitor_defaults.pid_file),
            log_file: expand_or(raw.monitor.log_file, monitor_defaults.log_file),
            check_interval: raw
                .monitor
                .check_interval
                .unwrap_or(monitor_defaults.check_interval),
        },
    })
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(expand(&p.to_string_lossy()));
    }
    if let Ok(env_path) = std::env::var("LOCALFLOW_CONFIG") {
        return Some(expand(&env_path));
    }
    dirs::home_dir().map(|h| h.join(".localflow").join("config.yml"))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn expand_or(value: Option<String>, default: PathBuf) -> PathBuf {
    value.map(|v| expand(&v)).unwrap_or(default)
}
