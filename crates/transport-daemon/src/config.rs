//! Daemon configuration file.

use crate::{DaemonError, DaemonResult, Paths};
use delivery_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable that overrides `log_level`.
pub const LOG_LEVEL_ENV: &str = "TRANSPORT_LOG_LEVEL";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// How a destination's batches are transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendKind {
    /// POST each batch as JSON to `url`.
    Http {
        url: String,
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_token: Option<String>,
    },
    /// Write each batch to the log and report success.
    Log,
}

/// One destination and its backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Destination name events are enqueued under.
    pub name: String,
    #[serde(flatten)]
    pub kind: BackendKind,
}

/// Main daemon configuration.
///
/// ```json
/// {
///   "log_level": "debug",
///   "scheduler": { "debounce_delay_ms": 250 },
///   "backends": [
///     { "name": "metrics", "kind": "http", "url": "https://collector.example/v1/batch" },
///     { "name": "audit", "kind": "log" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Event database. Defaults to `<base>/events.sqlite`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub scheduler: SchedulerConfig,
    pub backends: Vec<BackendConfig>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            database_path: None,
            scheduler: SchedulerConfig::default(),
            backends: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load `<base>/config.json`, falling back to defaults when it is absent,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> DaemonResult<Self> {
        let config_path = paths.config_file();
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> DaemonResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, paths: &Paths) -> DaemonResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            if !level.trim().is_empty() {
                self.log_level = level.trim().to_string();
            }
        }
    }

    /// Database file to open, resolved against `paths`.
    pub fn database_path(&self, paths: &Paths) -> PathBuf {
        match &self.database_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => paths.base_dir().join(path),
            None => paths.database_file(),
        }
    }

    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|backend| backend.name == name)
    }

    pub fn validate(&self) -> DaemonResult<()> {
        self.scheduler.validate()?;

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.name.trim().is_empty() {
                return Err(DaemonError::Config("backend name must not be empty".to_string()));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(DaemonError::Config(format!(
                    "backend {} is configured more than once",
                    backend.name
                )));
            }
            if let BackendKind::Http { url, timeout_secs, .. } = &backend.kind {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(DaemonError::Config(format!(
                        "backend {} has a non-HTTP url: {}",
                        backend.name, url
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(DaemonError::Config(format!(
                        "backend {} has a zero timeout",
                        backend.name
                    )));
                }
            }
        }
        Ok(())
    }
}
