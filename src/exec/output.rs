// src/exec/output.rs

//! Workflow output routing.
//!
//! Step output can go to the console, to a file, or both, controlled by
//! [`OutputConfig`]. The executor only sees the [`OutputSink`] trait so
//! tests can capture output without touching the filesystem.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::config::model::{OutputConfig, OutputMode};
use crate::errors::Result;

/// Receives step output chunks as they are produced.
pub trait OutputSink {
    fn write(&mut self, chunk: &str) -> Result<()>;
}

/// Default sink: routes chunks to stdout and/or an output file per config.
pub struct OutputHandler {
    to_stdout: bool,
    file: Option<File>,
}

impl OutputHandler {
    /// Build a handler from output config. `show_output` gates console
    /// echoing on top of the mode.
    pub fn from_config(config: &OutputConfig, show_output: bool) -> Result<Self> {
        let to_file = matches!(config.mode, OutputMode::File | OutputMode::Both);
        let file = match (&config.file, to_file) {
            (Some(path), true) => Some(open_output_file(path, config.append)?),
            _ => None,
        };
        let to_stdout = show_output
            && (file.is_none() || matches!(config.mode, OutputMode::Stdout | OutputMode::Both));
        Ok(Self { to_stdout, file })
    }
}

fn open_output_file(path: &Path, append: bool) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    Ok(file)
}

impl OutputSink for OutputHandler {
    fn write(&mut self, chunk: &str) -> Result<()> {
        if self.to_stdout {
            print!("{chunk}");
        }
        if let Some(file) = &mut self.file {
            file.write_all(chunk.as_bytes())?;
        }
        Ok(())
    }
}
