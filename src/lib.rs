// src/lib.rs

//! LocalFlow: run YAML-declared workflows locally, manually or on
//! file-system events.
//!
//! The library is organised around a few seams:
//! - [`workflow`]: the typed workflow model, id assignment and discovery
//! - [`condition`]: the restricted boolean expression language
//! - [`exec`]: command runners, output routing and the executor
//! - [`events`]: trigger matching, the persistent registry and the monitor
//! - [`daemon`]: PID-file lifecycle and the monitor service loop

pub mod cli;
pub mod condition;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod events;
pub mod exec;
pub mod logging;
pub mod workflow;

use std::collections::BTreeSet;

use tracing::debug;

use crate::cli::{CliArgs, Command, DaemonCommand, EventsCommand};
use crate::config::model::{Config, OutputMode};
use crate::daemon::manager::DaemonManager;
use crate::daemon::service::MonitorService;
use crate::errors::{LocalFlowError, Result};
use crate::events::registry::{EventRegistry, EventSource};
use crate::exec::executor::WorkflowExecutor;
use crate::workflow::model::Workflow;
use crate::workflow::registry::WorkflowRegistry;

/// Entry point for the CLI after argument parsing and logging setup.
pub fn run(args: CliArgs, config: Config) -> Result<()> {
    match args.command {
        Command::Run {
            workflow,
            job,
            output,
            output_mode,
            append,
        } => cmd_run(&config, &workflow, job.as_deref(), output, output_mode, append),
        Command::List { tag } => cmd_list(&config, tag),
        Command::Jobs { workflow } => cmd_jobs(&config, &workflow),
        Command::Events(cmd) => cmd_events(&config, cmd),
        Command::Daemon(cmd) => cmd_daemon(&config, cmd, args.config.as_deref()),
    }
}

fn discover(config: &Config) -> WorkflowRegistry {
    let mut registry = WorkflowRegistry::new();
    registry.discover(&config.workflow_dirs());
    registry
}

fn resolve_workflow<'a>(
    registry: &'a WorkflowRegistry,
    identifier: &str,
) -> Result<&'a Workflow> {
    registry
        .resolve(identifier)
        .ok_or_else(|| LocalFlowError::WorkflowNotFound(identifier.to_string()))
}

fn cmd_run(
    config: &Config,
    workflow_id: &str,
    job: Option<&str>,
    output: Option<std::path::PathBuf>,
    output_mode: Option<OutputMode>,
    append: bool,
) -> Result<()> {
    let registry = discover(config);
    let workflow = resolve_workflow(&registry, workflow_id)?.clone();

    // CLI flags override the configured output routing.
    let mut config = config.clone();
    if let Some(path) = output {
        config.output.file = Some(path);
        if output_mode.is_none() && config.output.mode == OutputMode::Stdout {
            config.output.mode = OutputMode::File;
        }
    }
    if let Some(mode) = output_mode {
        config.output.mode = mode;
    }
    if append {
        config.output.append = true;
    }

    let mut executor = WorkflowExecutor::new(workflow.clone(), config)?;
    let ok = match job {
        Some(job) => executor.execute_job(job)?,
        None => executor.run()?,
    };

    if ok {
        println!("Workflow '{}' completed successfully", workflow.name);
        Ok(())
    } else {
        Err(LocalFlowError::Other(anyhow::anyhow!(
            "workflow '{}' failed",
            workflow.name
        )))
    }
}

fn cmd_list(config: &Config, tags: Vec<String>) -> Result<()> {
    let registry = discover(config);
    let tags: BTreeSet<String> = tags.into_iter().collect();
    let filter = if tags.is_empty() { None } else { Some(&tags) };

    let workflows = registry.find(filter);
    if workflows.is_empty() {
        println!("No workflows found");
        return Ok(());
    }

    println!("{:<14} {:<28} {:<9} TAGS", "ID", "NAME", "VERSION");
    for wf in workflows {
        let tags: Vec<&str> = wf.tags.iter().map(String::as_str).collect();
        println!(
            "{:<14} {:<28} {:<9} {}",
            wf.id,
            wf.name,
            wf.version,
            tags.join(", ")
        );
    }
    Ok(())
}

fn cmd_jobs(config: &Config, workflow_id: &str) -> Result<()> {
    let registry = discover(config);
    let workflow = resolve_workflow(&registry, workflow_id)?;

    println!("Jobs in workflow '{}':", workflow.name);
    for job in workflow.jobs.values() {
        let needs: Vec<&str> = job.needs.iter().map(String::as_str).collect();
        let deps = if needs.is_empty() {
            String::new()
        } else {
            format!(" (needs: {})", needs.join(", "))
        };
        println!("  {:<14} {}{}", job.id, job.name, deps);
        if let Some(desc) = &job.description {
            println!("  {:<14} {}", "", desc);
        }
    }
    Ok(())
}

fn cmd_events(config: &Config, cmd: EventsCommand) -> Result<()> {
    let mut registry = EventRegistry::open(config.event_db_path())?;

    match cmd {
        EventsCommand::List {
            source,
            workflow,
            enabled_only,
        } => {
            let regs = registry.list(source, workflow.as_deref(), enabled_only);
            if regs.is_empty() {
                println!("No event registrations found");
                return Ok(());
            }
            println!(
                "{:<14} {:<14} {:<12} {:<7} {:<8} LAST TRIGGERED",
                "ID", "WORKFLOW", "TYPE", "SOURCE", "ENABLED"
            );
            for reg in regs {
                let last = reg
                    .last_triggered
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{:<14} {:<14} {:<12} {:<7} {:<8} {}",
                    reg.id, reg.workflow_id, reg.event_type, reg.source, reg.enabled, last
                );
            }
        }
        EventsCommand::Register { workflow } => {
            let workflows = discover(config);
            let wf = resolve_workflow(&workflows, &workflow)?;
            let source = if wf.source.starts_with(&config.local_workflows_dir) {
                EventSource::Local
            } else {
                EventSource::Global
            };
            let added = registry.register_workflow(wf, source)?;
            if added.is_empty() {
                println!("No new events registered for workflow '{}'", wf.name);
            } else {
                println!("Registered {} event(s):", added.len());
                for id in added {
                    println!("  {id}");
                }
            }
        }
        EventsCommand::Unregister { workflow } => {
            // Accept a raw workflow id even when the workflow file is gone.
            let workflows = discover(config);
            let workflow_id = workflows
                .resolve(&workflow)
                .map(|wf| wf.id.clone())
                .unwrap_or(workflow);
            let removed = registry.unregister_workflow(&workflow_id)?;
            println!("Unregistered {} event(s)", removed.len());
        }
        EventsCommand::Enable { event_id } => {
            if registry.enable(&event_id)? {
                println!("Enabled event {event_id}");
            } else {
                println!("No event registration with id {event_id}");
            }
        }
        EventsCommand::Disable { event_id } => {
            if registry.disable(&event_id)? {
                println!("Disabled event {event_id}");
            } else {
                println!("No event registration with id {event_id}");
            }
        }
    }
    Ok(())
}

fn cmd_daemon(
    config: &Config,
    cmd: DaemonCommand,
    config_file: Option<&std::path::Path>,
) -> Result<()> {
    let manager = DaemonManager::new(config.monitor.pid_file.clone(), config.monitor_log_path());

    match cmd {
        DaemonCommand::Start { foreground } => {
            if foreground {
                debug!("running monitor service in the foreground");
                let config = config.clone();
                manager.run_foreground(move || {
                    let runtime = tokio::runtime::Builder::new_multi_thread()
                        .enable_all()
                        .build()
                        .map_err(|e| anyhow::anyhow!("failed to build runtime: {e}"))?;
                    runtime.block_on(MonitorService::new(config).run())
                })
            } else {
                let pid = manager.start_background(config_file)?;
                println!("Daemon started (pid {pid})");
                println!("Log file: {}", config.monitor_log_path().display());
                Ok(())
            }
        }
        DaemonCommand::Stop => {
            let pid = manager.stop()?;
            println!("Daemon stopped (pid {pid})");
            Ok(())
        }
        DaemonCommand::Status => {
            match manager.status() {
                Some(pid) => println!("Daemon is running (pid {pid})"),
                None => println!("Daemon is not running"),
            }
            Ok(())
        }
    }
}
