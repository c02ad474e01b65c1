//! Cleanup command handler.
//!
//! Terminates a server left behind by a session that died without cleaning up.

use anyhow::Result;
use blockhost_runtime::{OrphanOutcome, PidFile, SupervisorOptions, recover_orphan};

use crate::bootstrap::CliContext;

/// Execute the cleanup command.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let pid_file = PidFile::new(ctx.paths.pid_file());
    let grace = SupervisorOptions::default().orphan_grace;

    println!("{}", describe(&recover_orphan(&pid_file, grace).await));
    Ok(())
}

fn describe(outcome: &OrphanOutcome) -> String {
    match outcome {
        OrphanOutcome::NoPidFile => "No server PID recorded; nothing to clean up.".to_string(),
        OrphanOutcome::Stale { pid } => {
            format!("Process {pid} was no longer running; removed the stale PID file.")
        }
        OrphanOutcome::Terminated { pid } => format!("Stopped leftover server process {pid}."),
        OrphanOutcome::ForceKilled { pid } => {
            format!("Leftover server process {pid} ignored the stop request and was killed.")
        }
        OrphanOutcome::KillFailed { pid, error } => {
            format!("Could not kill process {pid}: {error}. The PID file was removed.")
        }
    }
}
