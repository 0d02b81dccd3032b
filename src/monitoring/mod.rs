//! Monitoring module for docqa
//!
//! Provides structured logging with tracing: an optional console layer and
//! a daily-rotated log file under `~/.docqa/logs`.

pub mod config;
pub mod tracing_config;

pub use config::{LogFormat, MonitoringConfig};
pub use tracing_config::{init_tracing, MonitoringError};
