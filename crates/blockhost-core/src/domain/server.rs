//! Launch configuration for the supervised game server.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// Host operating system family.
///
/// Firewall mutation and remediation text differ per family, so callers pass
/// this explicitly rather than letting every module re-detect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsKind {
    Windows,
    #[serde(rename = "macos")]
    MacOs,
    Linux,
    /// Anything else (BSDs, etc.). Firewall automation is skipped.
    Other,
}

impl OsKind {
    /// The OS family this binary was compiled for.
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Fully resolved configuration handed to `ServerSupervisor::start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Java runtime used to launch the jar.
    pub java_path: PathBuf,
    /// Working directory of the server process; the jar lives here.
    pub server_dir: PathBuf,
    /// File name of the server jar inside `server_dir`.
    pub jar_name: String,
    /// Initial heap (`-Xms`), in megabytes.
    pub min_memory_mb: u32,
    /// Maximum heap (`-Xmx`), in megabytes.
    pub max_memory_mb: u32,
    /// Game port the server listens on.
    pub port: u16,
}

impl ServerConfig {
    /// Absolute path of the launchable jar.
    pub fn jar_path(&self) -> PathBuf {
        self.server_dir.join(&self.jar_name)
    }

    /// Arguments passed to the Java runtime.
    ///
    /// `<java> -Xms<min>M -Xmx<max>M -jar <jar> nogui`
    pub fn launch_args(&self) -> Vec<OsString> {
        vec![
            format!("-Xms{}M", self.min_memory_mb).into(),
            format!("-Xmx{}M", self.max_memory_mb).into(),
            "-jar".into(),
            self.jar_name.clone().into(),
            "nogui".into(),
        ]
    }
}
