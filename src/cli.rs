// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::model::OutputMode;
use crate::events::registry::EventSource;

/// Command-line arguments for `localflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "localflow",
    version,
    about = "Run YAML-declared workflows locally, manually or on file-system events.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (YAML).
    ///
    /// Default: `LOCALFLOW_CONFIG` or `~/.localflow/config.yml`.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Shortcut for `--log-level debug`.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LOCALFLOW_LOG` or the config file level is used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a workflow, or a single job and its dependencies.
    Run {
        /// Workflow id (or name) to run.
        workflow: String,

        /// Run only this job (id or name) and its dependencies.
        #[arg(long, value_name = "JOB")]
        job: Option<String>,

        /// Write workflow output to this file.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Where workflow output goes (stdout, file, both).
        #[arg(long, value_enum, value_name = "MODE")]
        output_mode: Option<OutputMode>,

        /// Append to the output file instead of truncating it.
        #[arg(long)]
        append: bool,
    },

    /// List available workflows.
    List {
        /// Only show workflows carrying all of these tags.
        #[arg(long, value_name = "TAG")]
        tag: Vec<String>,
    },

    /// List the jobs of a workflow.
    Jobs {
        /// Workflow id (or name).
        workflow: String,
    },

    /// Manage event trigger registrations.
    #[command(subcommand)]
    Events(EventsCommand),

    /// Manage the event monitor daemon.
    #[command(subcommand)]
    Daemon(DaemonCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum EventsCommand {
    /// List registered events.
    List {
        /// Filter by registration source.
        #[arg(long, value_enum)]
        source: Option<EventSource>,

        /// Filter by workflow id.
        #[arg(long, value_name = "ID")]
        workflow: Option<String>,

        /// Show only enabled events.
        #[arg(long)]
        enabled_only: bool,
    },

    /// Register the declared events of a workflow.
    Register {
        /// Workflow id (or name).
        workflow: String,
    },

    /// Remove all event registrations of a workflow.
    Unregister {
        /// Workflow id (or name).
        workflow: String,
    },

    /// Enable an event registration.
    Enable { event_id: String },

    /// Disable an event registration.
    Disable { event_id: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum DaemonCommand {
    /// Start the event monitor daemon.
    Start {
        /// Stay attached to the terminal instead of detaching.
        #[arg(long)]
        foreground: bool,
    },

    /// Stop a running daemon.
    Stop,

    /// Report whether the daemon is running.
    Status,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
