//! CLI-specific error types and exit codes.

use blockhost_runtime::SupervisorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A prerequisite (Java, the server jar) is missing.
    #[error("{0}")]
    Unavailable(String),

    /// The server could not be run.
    #[error("Server error: {0}")]
    Server(String),
}

impl CliError {
    /// Exit codes follow sysexits.h.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,      // EX_CONFIG
            Self::Unavailable(_) => 69, // EX_UNAVAILABLE
            Self::Server(_) => 70,      // EX_SOFTWARE
        }
    }
}

impl From<SupervisorError> for CliError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::MissingBinary { .. } | SupervisorError::JavaNotFound { .. } => {
                Self::Unavailable(err.to_string())
            }
            SupervisorError::AlreadyRunning { .. }
            | SupervisorError::Spawn(_)
            | SupervisorError::MissingPid => Self::Server(err.to_string()),
        }
    }
}
