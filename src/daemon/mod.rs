// src/daemon/mod.rs

//! Monitor daemon: PID-file lifecycle management and the long-running
//! monitor service loop.

pub mod manager;
pub mod service;

pub use manager::DaemonManager;
pub use service::MonitorService;
