//! Orphan recovery for a server left running by a previous supervisor.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::io::PidFile;
use super::verify::pid_exists;
use crate::process::shutdown::kill_pid;

/// What orphan recovery found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrphanOutcome {
    /// No PID file (or an unreadable one).
    NoPidFile,
    /// The recorded PID was not running; only the file was removed.
    Stale { pid: u32 },
    /// The orphan exited after the graceful request.
    Terminated { pid: u32 },
    /// The orphan ignored the graceful request and was killed.
    ForceKilled { pid: u32 },
    /// Killing failed; the file was removed anyway.
    KillFailed { pid: u32, error: String },
}

/// Terminate a server recorded in the PID file, if it is still alive.
///
/// # Strategy
/// 1. Read the PID file
/// 2. If the PID is alive, request graceful termination and escalate to a
///    forceful kill once `grace` elapses
/// 3. Remove the PID file regardless of the kill outcome
///
/// Never fails: every error is logged and reflected in the outcome.
pub async fn recover_orphan(pid_file: &PidFile, grace: Duration) -> OrphanOutcome {
    let pid = match pid_file.read() {
        Ok(Some(pid)) => pid,
        Ok(None) => {
            debug!("No orphaned PID file found");
            return OrphanOutcome::NoPidFile;
        }
        Err(e) => {
            warn!(path = %pid_file.path().display(), error = %e, "Failed to read PID file");
            remove_logged(pid_file);
            return OrphanOutcome::NoPidFile;
        }
    };

    let outcome = if pid_exists(pid) {
        info!(pid, "Found orphaned server process, terminating it");
        match kill_pid(pid, grace).await {
            Ok(false) => OrphanOutcome::Terminated { pid },
            Ok(true) => {
                warn!(pid, "Orphaned server ignored termination request, force-killed");
                OrphanOutcome::ForceKilled { pid }
            }
            Err(e) => {
                warn!(pid, error = %e, "Failed to kill orphaned server. Removing stale PID file.");
                OrphanOutcome::KillFailed {
                    pid,
                    error: e.to_string(),
                }
            }
        }
    } else {
        debug!(pid, "PID is not running, removing stale PID file");
        OrphanOutcome::Stale { pid }
    };

    remove_logged(pid_file);
    outcome
}

fn remove_logged(pid_file: &PidFile) {
    if let Err(e) = pid_file.remove() {
        warn!(path = %pid_file.path().display(), error = %e, "Failed to remove PID file");
    }
}
