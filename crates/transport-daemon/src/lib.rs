//! # Transport Daemon
//!
//! Host process for the transport runtime. It supplies what the runtime
//! leaves to its environment:
//!
//! - configuration (`~/.transport-daemon/config.json`)
//! - logging via the shared `observability` package
//! - backend capabilities (`http`, `log`) per configured destination
//! - a tokio-based work trigger that turns delay requests into
//!   `run_scheduled_work` calls

pub mod backends;
mod config;
mod daemon;
mod error;
pub mod host;
mod logging;
mod paths;

#[cfg(test)]
mod tests;

pub use config::{BackendConfig, BackendKind, DaemonConfig, DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV};
pub use daemon::{enqueue_blocking, Daemon};
pub use error::{DaemonError, DaemonResult};
pub use logging::{init_logging, SERVICE_NAME};
pub use paths::Paths;
