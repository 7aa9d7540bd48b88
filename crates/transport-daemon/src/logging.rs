//! Logging initialization for the daemon.

use std::io;
use std::path::PathBuf;

pub use observability::{init_with_config, LogConfig};

/// Service name written into every JSON log line.
pub const SERVICE_NAME: &str = "transport-daemon";

/// Initialize logging for the daemon.
///
/// Logs go to stderr, and additionally to `log_file` as JSON lines when one
/// is given. `RUST_LOG` takes precedence over `level`.
///
/// # Arguments
///
/// * `level` - Default log level (trace, debug, info, warn, error)
/// * `log_file` - Optional JSONL output file
pub fn init_logging(level: &str, log_file: Option<PathBuf>) -> io::Result<()> {
    init_with_config(LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        log_path: log_file,
        also_stderr: true,
    })
}
