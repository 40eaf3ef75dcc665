// src/logging.rs

//! Logging setup for `localflow` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `LOCALFLOW_LOG` environment variable (e.g. "info", "debug")
//! 3. `log_level` from the config file
//!
//! Logs are sent to STDERR so that stdout stays free for workflow output.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, config_level: &str) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(level_str(lvl)),
        None => EnvFilter::try_from_env("LOCALFLOW_LOG")
            .unwrap_or_else(|_| EnvFilter::new(config_level.to_lowercase())),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_str(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
