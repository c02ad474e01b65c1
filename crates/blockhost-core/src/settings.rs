//! Settings domain types, persistence, and validation.
//!
//! Settings are stored as JSON in `config.json` under the data root. Every
//! field has a default so a missing or partial file still loads.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::ServerConfig;
use crate::paths::DataPaths;

/// Default game port.
pub const DEFAULT_SERVER_PORT: u16 = 25565;

/// Default jar file name inside the server directory.
pub const DEFAULT_JAR_NAME: &str = "server.jar";

/// Default external IP-echo service.
pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";

/// Default reachability-check service. Queried as `?host=<ip>&port=<port>`.
pub const DEFAULT_REACHABILITY_URL: &str = "https://portchecker.io/api/query";

/// Application settings structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Server working directory; defaults to `<root>/server`.
    pub server_dir: Option<PathBuf>,

    /// Jar file name inside the server directory.
    pub jar_name: String,

    /// Initial heap in megabytes.
    pub min_memory_mb: u32,

    /// Maximum heap in megabytes.
    pub max_memory_mb: u32,

    /// Game port.
    pub port: u16,

    /// Explicit Java runtime; resolved from `JAVA_HOME`/`PATH` when unset.
    pub java_path: Option<PathBuf>,

    /// Whether to request a UPnP port mapping.
    pub enable_upnp: bool,

    /// Whether to attempt OS firewall mutation.
    pub configure_firewall: bool,

    /// IP-echo endpoint returning the public address as plain text.
    pub public_ip_url: String,

    /// Reachability-check endpoint.
    pub reachability_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_dir: None,
            jar_name: DEFAULT_JAR_NAME.to_string(),
            min_memory_mb: 1024,
            max_memory_mb: 2048,
            port: DEFAULT_SERVER_PORT,
            java_path: None,
            enable_upnp: true,
            configure_firewall: true,
            public_ip_url: DEFAULT_PUBLIC_IP_URL.to_string(),
            reachability_url: DEFAULT_REACHABILITY_URL.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults if the file is missing.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(SettingsError::Io(e)),
        };
        let settings: Self = serde_json::from_str(&content)?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        validate_settings(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Effective server directory for this data layout.
    pub fn effective_server_dir(&self, paths: &DataPaths) -> PathBuf {
        self.server_dir
            .clone()
            .unwrap_or_else(|| paths.server_dir())
    }

    /// Build the launch configuration once the Java runtime is known.
    pub fn server_config(&self, paths: &DataPaths, java_path: PathBuf) -> ServerConfig {
        ServerConfig {
            java_path,
            server_dir: self.effective_server_dir(paths),
            jar_name: self.jar_name.clone(),
            min_memory_mb: self.min_memory_mb,
            max_memory_mb: self.max_memory_mb,
            port: self.port,
        }
    }
}

/// Settings validation and persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Port must be between 1 and 65535")]
    InvalidPort,

    #[error("Memory sizes must be greater than zero")]
    ZeroMemory,

    #[error("Minimum memory ({min} MB) exceeds maximum memory ({max} MB)")]
    MemoryRange { min: u32, max: u32 },

    #[error("Jar name cannot be empty")]
    EmptyJarName,

    #[error("Failed to read or write settings: {0}")]
    Io(#[from] io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings.port == 0 {
        return Err(SettingsError::InvalidPort);
    }
    if settings.min_memory_mb == 0 || settings.max_memory_mb == 0 {
        return Err(SettingsError::ZeroMemory);
    }
    if settings.min_memory_mb > settings.max_memory_mb {
        return Err(SettingsError::MemoryRange {
            min: settings.min_memory_mb,
            max: settings.max_memory_mb,
        });
    }
    if settings.jar_name.trim().is_empty() {
        return Err(SettingsError::EmptyJarName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.port, DEFAULT_SERVER_PORT);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"port": 25570, "maxMemoryMb": 4096}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.port, 25570);
        assert_eq!(settings.max_memory_mb, 4096);
        assert_eq!(settings.jar_name, DEFAULT_JAR_NAME);
        assert!(settings.enable_upnp);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let settings = Settings {
            java_path: Some(PathBuf::from("/opt/java/bin/java")),
            configure_firewall: false,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn rejects_inverted_memory_range() {
        let settings = Settings {
            min_memory_mb: 4096,
            max_memory_mb: 1024,
            ..Settings::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::MemoryRange { min: 4096, max: 1024 })
        ));
    }

    #[test]
    fn rejects_port_zero() {
        let settings = Settings {
            port: 0,
            ..Settings::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidPort)
        ));
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "port: 25565").unwrap();
        assert!(matches!(Settings::load(&path), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn server_dir_defaults_under_root() {
        let paths = DataPaths::new("/data/bh");
        let config = Settings::default().server_config(&paths, PathBuf::from("java"));
        assert_eq!(config.server_dir, PathBuf::from("/data/bh/server"));
        assert_eq!(config.jar_name, "server.jar");
    }
}
