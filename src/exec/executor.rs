// src/exec/executor.rs

//! Dependency-aware workflow executor.
//!
//! Jobs run strictly sequentially. `needs` dependencies are resolved
//! depth-first with an explicit execution-path stack, so a diamond
//! dependency runs its shared ancestor once while a true cycle is reported
//! with the full offending chain. A job whose condition evaluates to false
//! is skipped, and a skipped job satisfies its dependents.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::model::Config;
use crate::errors::{LocalFlowError, Result};
use crate::exec::output::{OutputHandler, OutputSink};
use crate::exec::runner::{CommandRunner, ContainerRunner, ShellRunner};
use crate::workflow::model::{Job, Step, Workflow};

/// Terminal state of one job within a single executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl JobStatus {
    /// Whether this state satisfies dependent jobs. Skipping is a
    /// deliberate non-failure.
    pub fn counts_as_success(self) -> bool {
        !matches!(self, JobStatus::Failed)
    }
}

/// Executes one workflow's jobs in dependency order.
pub struct WorkflowExecutor {
    workflow: Workflow,
    config: Config,
    shell: Box<dyn CommandRunner>,
    container: Option<Box<dyn CommandRunner>>,
    output: Box<dyn OutputSink>,
    completed: HashMap<String, JobStatus>,
}

impl WorkflowExecutor {
    /// Build an executor for `workflow`, validating it first.
    pub fn new(workflow: Workflow, config: Config) -> Result<Self> {
        let errors = workflow.validate();
        if !errors.is_empty() {
            return Err(LocalFlowError::Validation(errors));
        }

        let shell: Box<dyn CommandRunner> = Box::new(ShellRunner::new(&config.default_shell));
        let container: Option<Box<dyn CommandRunner>> = if config.container_enabled {
            Some(Box::new(ContainerRunner::new(&config.container_image)))
        } else {
            None
        };
        let output: Box<dyn OutputSink> =
            Box::new(OutputHandler::from_config(&config.output, config.show_output)?);

        Ok(Self {
            workflow,
            config,
            shell,
            container,
            output,
            completed: HashMap::new(),
        })
    }

    /// Replace the shell runner. Used by tests to fake command execution.
    pub fn with_shell_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.shell = runner;
        self
    }

    /// Replace the output sink.
    pub fn with_output(mut self, output: Box<dyn OutputSink>) -> Self {
        self.output = output;
        self
    }

    /// Job statuses recorded during the last run.
    pub fn statuses(&self) -> &HashMap<String, JobStatus> {
        &self.completed
    }

    /// Run every job in the workflow, stopping at the first failure.
    pub fn run(&mut self) -> Result<bool> {
        self.completed.clear();
        info!(workflow = %self.workflow.name, "running workflow");

        let jobs: Vec<Job> = self.workflow.jobs.values().cloned().collect();
        for job in jobs {
            if self.completed.contains_key(&job.id) {
                continue;
            }
            let mut path = Vec::new();
            if !self.execute_with_deps(job, &mut path)? {
                info!(workflow = %self.workflow.name, success = false, "workflow finished");
                return Ok(false);
            }
        }

        info!(workflow = %self.workflow.name, success = true, "workflow finished");
        Ok(true)
    }

    /// Run a single job (and its dependency closure), addressed by job id
    /// or name.
    pub fn execute_job(&mut self, identifier: &str) -> Result<bool> {
        self.completed.clear();
        let job = self
            .workflow
            .job(identifier)
            .cloned()
            .ok_or_else(|| LocalFlowError::JobNotFound(identifier.to_string()))?;
        let mut path = Vec::new();
        self.execute_with_deps(job, &mut path)
    }

    /// Run the given jobs in order, sharing one completion state. Used by
    /// the event monitor for registrations restricted to specific jobs.
    pub fn execute_jobs(&mut self, identifiers: &[String]) -> Result<bool> {
        self.completed.clear();
        let mut all_ok = true;
        for identifier in identifiers {
            let job = self
                .workflow
                .job(identifier)
                .cloned()
                .ok_or_else(|| LocalFlowError::JobNotFound(identifier.clone()))?;
            if self.completed.contains_key(&job.id) {
                continue;
            }
            let mut path = Vec::new();
            if !self.execute_with_deps(job, &mut path)? {
                all_ok = false;
            }
        }
        Ok(all_ok)
    }

    fn execute_with_deps(&mut self, job: Job, path: &mut Vec<String>) -> Result<bool> {
        if let Some(status) = self.completed.get(&job.id) {
            return Ok(status.counts_as_success());
        }

        if path.contains(&job.id) {
            let mut cycle = path.clone();
            cycle.push(job.id.clone());
            return Err(LocalFlowError::CycleDetected { path: cycle });
        }
        path.push(job.id.clone());

        for needed in job.needs.clone() {
            let dep = self
                .workflow
                .job(&needed)
                .cloned()
                .ok_or_else(|| LocalFlowError::DependencyNotFound(needed.clone()))?;
            if !self.execute_with_deps(dep, path)? {
                warn!(job = %job.name, dependency = %needed, "dependency failed, aborting job");
                path.pop();
                self.completed.insert(job.id.clone(), JobStatus::Failed);
                return Ok(false);
            }
        }

        if let Some(condition) = &job.condition {
            let context = self.condition_context();
            if !condition.evaluate(&context)? {
                info!(job = %job.name, condition = %condition.expression, "condition false, skipping job");
                path.pop();
                self.completed.insert(job.id.clone(), JobStatus::Skipped);
                return Ok(true);
            }
        }

        let ok = self.run_steps(&job)?;
        path.pop();
        let status = if ok {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        };
        self.completed.insert(job.id, status);
        Ok(ok)
    }

    /// Completion context seen by conditions: every job id in the workflow,
    /// true when the job has completed in a non-failed state.
    fn condition_context(&self) -> HashMap<String, bool> {
        self.workflow
            .jobs
            .values()
            .map(|job| {
                let done = self
                    .completed
                    .get(&job.id)
                    .is_some_and(|s| s.counts_as_success());
                (job.id.clone(), done)
            })
            .collect()
    }

    fn run_steps(&mut self, job: &Job) -> Result<bool> {
        info!(job = %job.name, steps = job.steps.len(), "running job");

        for step in &job.steps {
            let Some(command) = &step.run else {
                warn!(job = %job.name, step = step.display_name(), "step has no command");
                return Ok(false);
            };

            let env = self.step_env(job, step);
            let working_dir = step.working_dir.as_deref();
            debug!(job = %job.name, step = step.display_name(), "running step");

            let result = self.runner_for(step).run(command, working_dir, &env)?;
            if !result.output.is_empty() {
                self.output.write(&result.output)?;
            }

            if !result.success() {
                warn!(
                    job = %job.name,
                    step = step.display_name(),
                    exit_code = result.exit_code,
                    "step failed"
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn runner_for(&self, step: &Step) -> &dyn CommandRunner {
        match &self.container {
            Some(container) if self.config.container_enabled && !step.local => {
                container.as_ref()
            }
            _ => self.shell.as_ref(),
        }
    }

    /// Process environment overlaid with workflow, job and step variables,
    /// later layers winning.
    fn step_env(&self, job: &Job, step: &Step) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = std::env::vars().collect();
        env.extend(self.workflow.env.clone());
        env.extend(job.env.clone());
        env.extend(step.env.clone());
        env
    }
}
