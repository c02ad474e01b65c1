//! External command execution port.
//!
//! Firewall mutation and privilege probing shell out to OS tools (`netsh`,
//! `socketfilterfw`, `iptables`, `ufw`). Going through this port keeps the
//! command sequencing testable without touching the host firewall.

use async_trait::async_trait;
use std::io;
use std::time::Duration;

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Human-readable failure detail (stderr, else stdout, else exit code).
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs a program to completion with a time bound.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`.
    ///
    /// Returns `Err` when the program cannot be started or exceeds `timeout`;
    /// a non-zero exit is `Ok` with `success == false`.
    async fn run(&self, program: &str, args: &[String], timeout: Duration)
    -> io::Result<CommandOutput>;
}
