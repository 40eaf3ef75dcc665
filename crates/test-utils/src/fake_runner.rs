use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use localflow::errors::Result;
use localflow::exec::output::OutputSink;
use localflow::exec::runner::{CommandResult, CommandRunner};

/// One recorded command invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub env: HashMap<String, String>,
}

/// A fake command runner that:
/// - records each command it is asked to run
/// - succeeds with a canned output, unless the command contains one of the
///   configured failure substrings.
pub struct FakeRunner {
    invocations: Arc<Mutex<Vec<Invocation>>>,
    fail_on: Vec<String>,
}

impl FakeRunner {
    pub fn new(invocations: Arc<Mutex<Vec<Invocation>>>) -> Self {
        Self {
            invocations,
            fail_on: Vec::new(),
        }
    }

    /// Commands containing `needle` will exit non-zero.
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        command: &str,
        _working_dir: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<CommandResult> {
        let mut guard = self.invocations.lock().unwrap();
        guard.push(Invocation {
            command: command.to_string(),
            env: env.clone(),
        });

        let failed = self.fail_on.iter().any(|needle| command.contains(needle));
        Ok(CommandResult {
            exit_code: if failed { 1 } else { 0 },
            output: format!("ran: {command}\n"),
        })
    }
}

/// Output sink that captures everything written to it.
#[derive(Default)]
pub struct CaptureSink {
    chunks: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn new(chunks: Arc<Mutex<Vec<String>>>) -> Self {
        Self { chunks }
    }
}

impl OutputSink for CaptureSink {
    fn write(&mut self, chunk: &str) -> Result<()> {
        self.chunks.lock().unwrap().push(chunk.to_string());
        Ok(())
    }
}
