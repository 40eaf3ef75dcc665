// src/config/mod.rs

pub mod loader;
pub mod model;

pub use loader::load_config;
pub use model::{Config, MonitorConfig, OutputConfig, OutputMode};
