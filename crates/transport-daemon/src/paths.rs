//! File system paths for the daemon.

use crate::{DaemonError, DaemonResult};
use std::path::{Path, PathBuf};

const BASE_DIR_NAME: &str = ".transport-daemon";
const DATABASE_FILE_NAME: &str = "events.sqlite";
const LOG_FILE_NAME: &str = "transport-daemon.jsonl";

/// Manages file system paths for the daemon.
#[derive(Debug, Clone)]
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Paths rooted at `~/.transport-daemon`.
    pub fn new() -> DaemonResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| DaemonError::Path("Could not determine home directory".to_string()))?;
        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// `<base>/config.json`
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// `<base>/events.sqlite`, used unless the config names another file.
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join(DATABASE_FILE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// `<base>/logs/transport-daemon.jsonl`
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join(LOG_FILE_NAME)
    }

    pub fn ensure_dirs(&self) -> DaemonResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_layout() {
        let paths = Paths::with_base_dir(PathBuf::from("/tmp/td"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/td/config.json"));
        assert_eq!(paths.database_file(), PathBuf::from("/tmp/td/events.sqlite"));
        assert_eq!(
            paths.log_file(),
            PathBuf::from("/tmp/td/logs/transport-daemon.jsonl")
        );
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("base"));
        paths.ensure_dirs().unwrap();
        assert!(paths.base_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
