// src/exec/mod.rs

//! Job and step execution: command runners, output routing and the
//! dependency-aware workflow executor.

pub mod executor;
pub mod output;
pub mod runner;

pub use executor::{JobStatus, WorkflowExecutor};
pub use output::{OutputHandler, OutputSink};
pub use runner::{CommandResult, CommandRunner, ContainerRunner, ShellRunner};
