//! Canonical file layout under the data root.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::error::PathError;
use super::platform::data_root;

/// Locations of every file blockhost persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Layout rooted at an explicit directory (tests, embedding).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at the resolved data root.
    pub fn from_env() -> Result<Self, PathError> {
        Ok(Self::new(data_root()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// PID of the supervised server, one integer in plain text.
    pub fn pid_file(&self) -> PathBuf {
        self.root.join("server.pid")
    }

    /// Persisted `NetworkStatus` as JSON.
    pub fn network_file(&self) -> PathBuf {
        self.root.join("network.json")
    }

    /// User settings as JSON.
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Default working directory of the game server.
    pub fn server_dir(&self) -> PathBuf {
        self.root.join("server")
    }

    /// Directory holding the dated server output logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Log file for a server process started on `date`.
    pub fn log_file_for(&self, date: NaiveDate) -> PathBuf {
        self.logs_dir()
            .join(format!("server-{}.log", date.format("%Y-%m-%d")))
    }

    /// Create the root and logs directories if they are missing.
    pub fn ensure(&self) -> Result<(), PathError> {
        for dir in [self.root.clone(), self.logs_dir()] {
            if dir.exists() && !dir.is_dir() {
                return Err(PathError::NotADirectory(dir));
            }
            fs::create_dir_all(&dir).map_err(|e| PathError::CreateFailed {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
