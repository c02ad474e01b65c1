//! Errors surfaced by process supervision.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that prevent the game server from running.
///
/// Everything secondary (PID-file bookkeeping, log writes, network exposure)
/// is logged instead and never shows up here.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The server jar is not where the configuration says it is.
    #[error("Server binary not found at {path}. Download the server jar first.")]
    MissingBinary { path: PathBuf },

    /// A server is already supervised by this process.
    #[error("Server is already running (PID {pid})")]
    AlreadyRunning { pid: u32 },

    /// The OS refused to start the process.
    #[error("Failed to launch server process: {0}")]
    Spawn(#[source] io::Error),

    /// The process started but exited before its PID could be read.
    #[error("Server process exited before reporting a PID")]
    MissingPid,

    /// No usable Java runtime.
    #[error("Java runtime not found: {reason}")]
    JavaNotFound { reason: String },
}
