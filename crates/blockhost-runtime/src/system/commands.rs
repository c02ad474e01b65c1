//! Bounded execution of OS tools.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use blockhost_core::{CommandOutput, CommandRunner};
use tokio::process::Command;
use tracing::debug;

/// [`CommandRunner`] backed by real child processes.
///
/// Programs are looked up on `PATH`; stdin is closed. A command exceeding
/// its timeout is killed and reported as [`io::ErrorKind::TimedOut`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> io::Result<CommandOutput> {
        debug!(%program, ?args, "Running command");

        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{program} timed out after {}s", timeout.as_secs()),
                )
            })??;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// First non-empty line of a command's output, stdout before stderr.
///
/// Some tools (notably `java -version`) print their version to stderr.
pub fn first_output_line(output: &CommandOutput) -> Option<String> {
    let text = if output.stdout.trim().is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
