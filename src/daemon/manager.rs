// src/daemon/manager.rs

//! PID-file based daemon lifecycle.
//!
//! Single-instance semantics come from an exclusive non-blocking lock on
//! the PID file held for the lifetime of the foreground process. Liveness
//! checks verify both that the recorded pid exists and that it belongs to
//! one of our processes, so a recycled pid never counts as a running
//! daemon; stale PID files are cleaned up on sight.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use nix::fcntl::{Flock, FlockArg};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use sysinfo::{ProcessesToUpdate, System};
use tracing::{info, warn};

use crate::errors::{LocalFlowError, Result};

const STOP_POLL_ATTEMPTS: u32 = 20;
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Manages the monitor daemon's PID file and process lifecycle.
#[derive(Debug, Clone)]
pub struct DaemonManager {
    pid_file: PathBuf,
    log_file: PathBuf,
    /// Substring the daemon's command line must contain to count as ours.
    process_name: String,
}

impl DaemonManager {
    pub fn new(pid_file: PathBuf, log_file: PathBuf) -> Self {
        Self {
            pid_file,
            log_file,
            process_name: "localflow".to_string(),
        }
    }

    /// Override the command-line needle used for liveness verification.
    /// Tests use this to make the current test binary count as the daemon.
    pub fn with_process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = name.into();
        self
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Pid of the running daemon, if any. Removes a stale PID file (no
    /// such process, or the pid belongs to an unrelated process).
    pub fn status(&self) -> Option<i32> {
        if !self.pid_file.exists() {
            return None;
        }
        let pid = std::fs::read_to_string(&self.pid_file)
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok());
        match pid {
            Some(pid) if self.is_our_process(pid) => Some(pid),
            _ => {
                warn!(pid_file = %self.pid_file.display(), "removing stale PID file");
                let _ = std::fs::remove_file(&self.pid_file);
                None
            }
        }
    }

    fn is_our_process(&self, pid: i32) -> bool {
        let mut system = System::new_all();
        system.refresh_processes(ProcessesToUpdate::All);
        let Some(process) = system.process(sysinfo::Pid::from(pid as usize)) else {
            return false;
        };
        let needle = self.process_name.to_lowercase();
        let in_cmd = process
            .cmd()
            .iter()
            .any(|part| part.to_string_lossy().to_lowercase().contains(&needle));
        in_cmd || process.name().to_string_lossy().to_lowercase().contains(&needle)
    }

    /// Run `service` in the foreground with the PID file locked for the
    /// duration. Fails with [`LocalFlowError::AlreadyRunning`] when another
    /// instance holds the lock.
    pub fn run_foreground<F>(&self, service: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        if let Some(parent) = self.pid_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.pid_file)?;

        let mut lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => lock,
            Err((_, _)) => {
                let pid = std::fs::read_to_string(&self.pid_file)
                    .ok()
                    .and_then(|s| s.trim().parse::<i32>().ok())
                    .unwrap_or(0);
                return Err(LocalFlowError::AlreadyRunning(pid));
            }
        };

        lock.set_len(0)?;
        write!(lock, "{}", std::process::id())?;
        lock.flush()?;
        info!(pid_file = %self.pid_file.display(), pid = std::process::id(), "created PID file");

        let result = service();

        drop(lock);
        let _ = std::fs::remove_file(&self.pid_file);
        info!(pid_file = %self.pid_file.display(), "removed PID file");

        result
    }

    /// Start the daemon in the background by re-executing this binary with
    /// the foreground flag, output redirected to the daemon log file.
    /// Returns the spawned pid.
    pub fn start_background(&self, config_file: Option<&Path>) -> Result<i32> {
        if let Some(pid) = self.status() {
            return Err(LocalFlowError::AlreadyRunning(pid));
        }

        if let Some(parent) = self.log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;
        let log_err = log.try_clone()?;

        let exe = std::env::current_exe()?;
        let mut cmd = Command::new(exe);
        if let Some(path) = config_file {
            cmd.arg("--config").arg(path);
        }
        cmd.args(["daemon", "start", "--foreground"]);
        cmd.stdin(Stdio::null()).stdout(log).stderr(log_err);
        if let Some(home) = dirs::home_dir() {
            cmd.current_dir(home);
        }
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn()?;
        let pid = child.id() as i32;
        info!(pid, log = %self.log_file.display(), "started monitor daemon");
        Ok(pid)
    }

    /// Stop the running daemon: SIGTERM, wait up to ten seconds, then
    /// escalate to SIGKILL. The PID file is removed regardless.
    pub fn stop(&self) -> Result<i32> {
        let Some(pid) = self.status() else {
            return Err(LocalFlowError::NotRunning);
        };

        kill(Pid::from_raw(pid), Signal::SIGTERM)
            .map_err(|e| anyhow::anyhow!("failed to signal daemon {pid}: {e}"))?;

        let mut alive = true;
        for _ in 0..STOP_POLL_ATTEMPTS {
            if !self.is_our_process(pid) {
                alive = false;
                break;
            }
            std::thread::sleep(STOP_POLL_INTERVAL);
        }

        if alive {
            warn!(pid, "daemon did not exit, sending SIGKILL");
            kill(Pid::from_raw(pid), Signal::SIGKILL)
                .map_err(|e| anyhow::anyhow!("failed to kill daemon {pid}: {e}"))?;
        }

        let _ = std::fs::remove_file(&self.pid_file);
        info!(pid, "stopped monitor daemon");
        Ok(pid)
    }
}
