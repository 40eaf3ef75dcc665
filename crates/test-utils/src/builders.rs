#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use localflow::config::model::Config;
use localflow::workflow::ids::generate_id;
use localflow::workflow::model::{Condition, Job, Step, Workflow};

/// Builder for `Workflow` to simplify test setup.
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            workflow: Workflow {
                id: generate_id("wf", name),
                name: name.to_string(),
                description: None,
                version: "1.0.0".to_string(),
                author: None,
                tags: BTreeSet::new(),
                env: BTreeMap::new(),
                jobs: BTreeMap::new(),
                events: Vec::new(),
                source: PathBuf::from(format!("{name}.yml")),
                created_at: None,
                modified_at: None,
            },
        }
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.workflow.jobs.insert(job.name.clone(), job);
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.workflow.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.workflow.tags.insert(tag.to_string());
        self
    }

    pub fn build(self) -> Workflow {
        self.workflow
    }
}

/// Builder for `Job`. The job id defaults to `job_<name>` so tests can refer
/// to dependencies without computing hashes.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            job: Job {
                id: format!("job_{name}"),
                name: name.to_string(),
                description: None,
                tags: BTreeSet::new(),
                condition: None,
                steps: Vec::new(),
                env: BTreeMap::new(),
                needs: BTreeSet::new(),
            },
        }
    }

    pub fn needs(mut self, job_id: &str) -> Self {
        self.job.needs.insert(job_id.to_string());
        self
    }

    pub fn step(mut self, run: &str) -> Self {
        self.job.steps.push(Step {
            name: None,
            run: Some(run.to_string()),
            working_dir: None,
            env: BTreeMap::new(),
            local: false,
        });
        self
    }

    pub fn step_without_command(mut self) -> Self {
        self.job.steps.push(Step {
            name: Some("broken".to_string()),
            run: None,
            working_dir: None,
            env: BTreeMap::new(),
            local: false,
        });
        self
    }

    pub fn condition(mut self, expression: &str) -> Self {
        self.job.condition = Some(Condition {
            expression: expression.to_string(),
            references: BTreeSet::new(),
        });
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.job.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

/// Config with quiet output, suitable for executor tests.
pub fn test_config() -> Config {
    let mut config = Config::defaults();
    config.show_output = false;
    config
}
