// src/events/mod.rs

//! Event-driven execution: trigger matching, the persistent registration
//! registry and the filesystem monitor.

pub mod monitor;
pub mod registry;
pub mod trigger;

pub use monitor::{classify_event, EventMonitor};
pub use registry::{EventRegistration, EventRegistry, EventSource};
pub use trigger::FileSnapshot;
