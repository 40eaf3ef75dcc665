// src/exec/runner.rs

//! Command runners.
//!
//! A [`CommandRunner`] turns one step command into an exit code and its
//! captured output. The executor picks a runner per step: the shell runner
//! by default, the container runner when containers are enabled and the
//! step is not marked `local`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::Result;

/// Outcome of one executed command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: i32,
    /// Captured stdout followed by stderr, newline terminated.
    pub output: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes one command with a working directory and a fully merged
/// environment.
pub trait CommandRunner {
    fn run(
        &self,
        command: &str,
        working_dir: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult>;
}

/// Runs commands through a local shell (`<shell> -c <command>`).
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(
        &self,
        command: &str,
        working_dir: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        cmd.env_clear().envs(env);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        collect(cmd)
    }
}

/// Runs commands inside a container via the local container engine.
///
/// The current working directory is mounted at `/workspace` so relative
/// paths inside the command line keep working.
#[derive(Debug, Clone)]
pub struct ContainerRunner {
    engine: String,
    image: String,
}

impl ContainerRunner {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            engine: "docker".to_string(),
            image: image.into(),
        }
    }
}

impl CommandRunner for ContainerRunner {
    fn run(
        &self,
        command: &str,
        working_dir: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult> {
        let host_dir = match working_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        let mut cmd = Command::new(&self.engine);
        cmd.arg("run").arg("--rm");
        cmd.arg("-v")
            .arg(format!("{}:/workspace", host_dir.display()));
        cmd.arg("-w").arg("/workspace");
        for (key, value) in env {
            cmd.arg("-e").arg(format!("{key}={value}"));
        }
        cmd.arg(&self.image).arg("sh").arg("-c").arg(command);
        collect(cmd)
    }
}

fn collect(mut cmd: Command) -> Result<CommandResult> {
    let out = cmd.output()?;
    let mut output = String::new();
    output.push_str(&String::from_utf8_lossy(&out.stdout));
    output.push_str(&String::from_utf8_lossy(&out.stderr));
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(CommandResult {
        exit_code: out.status.code().unwrap_or(-1),
        output,
    })
}
