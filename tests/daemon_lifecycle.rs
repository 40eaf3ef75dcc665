use std::process::Command;
use std::sync::mpsc;
use std::thread;

use localflow::daemon::manager::DaemonManager;
use localflow::errors::LocalFlowError;
use localflow_test_utils::init_tracing;

fn manager(dir: &tempfile::TempDir) -> DaemonManager {
    DaemonManager::new(
        dir.path().join("monitor.pid"),
        dir.path().join("monitor.log"),
    )
}

/// Pid of a process that has already exited.
fn dead_pid() -> i32 {
    let mut child = Command::new("true").spawn().unwrap();
    let pid = child.id() as i32;
    child.wait().unwrap();
    pid
}

#[test]
fn test_status_without_pid_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(manager(&dir).status(), None);
}

#[test]
fn test_stale_pid_file_is_cleaned_up() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);

    std::fs::write(manager.pid_file(), dead_pid().to_string()).unwrap();
    assert_eq!(manager.status(), None);
    assert!(!manager.pid_file().exists());
}

#[test]
fn test_garbage_pid_file_is_cleaned_up() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);

    std::fs::write(manager.pid_file(), "not a pid").unwrap();
    assert_eq!(manager.status(), None);
    assert!(!manager.pid_file().exists());
}

#[test]
fn test_pid_of_unrelated_process_counts_as_stale() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    // Pid 1 exists but is certainly not one of our processes.
    let manager = manager(&dir).with_process_name("localflow-monitor-daemon");

    std::fs::write(manager.pid_file(), "1").unwrap();
    assert_eq!(manager.status(), None);
    assert!(!manager.pid_file().exists());
}

#[test]
fn test_status_recognises_our_own_process() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    // The test binary's path contains the test target name, so matching on
    // it makes the current process count as the daemon.
    let manager = manager(&dir).with_process_name("daemon_lifecycle");

    let own_pid = std::process::id() as i32;
    std::fs::write(manager.pid_file(), own_pid.to_string()).unwrap();
    assert_eq!(manager.status(), Some(own_pid));
    assert!(manager.pid_file().exists());
}

#[test]
fn test_stop_without_daemon_is_not_running() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let err = manager(&dir).stop().unwrap_err();
    assert!(matches!(err, LocalFlowError::NotRunning));
}

#[test]
fn test_foreground_run_writes_and_removes_pid_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);

    let pid_file = manager.pid_file().to_path_buf();
    manager
        .run_foreground(|| {
            let content = std::fs::read_to_string(&pid_file).unwrap();
            assert_eq!(content, std::process::id().to_string());
            Ok(())
        })
        .unwrap();

    assert!(!pid_file.exists());
}

#[test]
fn test_second_start_reports_already_running() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let first = manager(&dir);
    let second = first.clone();

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    // Hold the foreground lock on a helper thread until released.
    let holder = thread::spawn(move || {
        first.run_foreground(move || {
            locked_tx.send(()).unwrap();
            release_rx.recv().unwrap();
            Ok(())
        })
    });

    locked_rx.recv().unwrap();
    let err = second.run_foreground(|| Ok(())).unwrap_err();
    match err {
        LocalFlowError::AlreadyRunning(pid) => {
            assert_eq!(pid, std::process::id() as i32);
        }
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    release_tx.send(()).unwrap();
    holder.join().unwrap().unwrap();
    assert!(!second.pid_file().exists());
}

#[test]
fn test_foreground_run_removes_pid_file_on_service_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&dir);

    let result = manager.run_foreground(|| Err(LocalFlowError::NotRunning));
    assert!(result.is_err());
    assert!(!manager.pid_file().exists());
}
