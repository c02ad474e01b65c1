//! Kill processes by PID without reaping (no `Child` handle available).

use std::io;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::pidfile::pid_exists;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Interval between liveness polls while waiting for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for the process table to drop the PID after a forced kill.
const FORCED_EXIT_WAIT: Duration = Duration::from_secs(2);

/// Kill a process by PID with graceful → forceful escalation.
///
/// # Strategy
/// 1. Request cooperative termination (SIGTERM / `taskkill`)
/// 2. Poll for up to `grace` to verify process exit
/// 3. If still alive, kill forcefully (SIGKILL / `taskkill /F`)
/// 4. Poll again briefly to verify exit
///
/// No `Child` handle exists, so the process **cannot be reaped** here.
///
/// # Returns
/// - `Ok(true)` if the forceful kill was needed
/// - `Ok(false)` if the process exited gracefully or was already gone
/// - `Err` if signalling fails or the process survives the forceful kill
pub async fn kill_pid(pid: u32, grace: Duration) -> io::Result<bool> {
    if !request_termination(pid).await? {
        return Ok(false);
    }

    if wait_for_exit(pid, grace).await {
        debug!(pid, "Process exited after graceful termination request");
        return Ok(false);
    }

    debug!(pid, grace_ms = grace.as_millis() as u64, "Grace window elapsed, escalating");
    force_kill_pid(pid)?;

    if wait_for_exit(pid, FORCED_EXIT_WAIT).await {
        return Ok(true);
    }

    Err(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("process {pid} did not exit after forced kill"),
    ))
}

async fn wait_for_exit(pid: u32, within: Duration) -> bool {
    let polls = (within.as_millis() / POLL_INTERVAL.as_millis()).max(1);
    for _ in 0..polls {
        sleep(POLL_INTERVAL).await;
        if !pid_exists(pid) {
            return true;
        }
    }
    false
}

/// Send the cooperative termination request.
///
/// Returns `Ok(false)` when the process is already gone.
#[cfg(unix)]
async fn request_termination(pid: u32) -> io::Result<bool> {
    let nix_pid = to_nix_pid(pid)?;
    match signal::kill(nix_pid, Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
async fn request_termination(pid: u32) -> io::Result<bool> {
    if !pid_exists(pid) {
        return Ok(false);
    }
    // Without /F taskkill asks the process to close
    let _ = tokio::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T"])
        .output()
        .await?;
    Ok(true)
}

/// Kill a process immediately (SIGKILL / `taskkill /F`).
///
/// Synchronous so it can run from exit hooks. A process that is already
/// gone is not an error.
#[cfg(unix)]
pub fn force_kill_pid(pid: u32) -> io::Result<()> {
    match signal::kill(to_nix_pid(pid)?, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[cfg(not(unix))]
pub fn force_kill_pid(pid: u32) -> io::Result<()> {
    if !pid_exists(pid) {
        return Ok(());
    }
    let output = std::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .output()?;
    if output.status.success() || !pid_exists(pid) {
        Ok(())
    } else {
        Err(io::Error::other(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

#[cfg(unix)]
fn to_nix_pid(pid: u32) -> io::Result<Pid> {
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid PID {pid}")))
}
