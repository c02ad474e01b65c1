//! Status command handler.

use anyhow::Result;
use blockhost_runtime::PidFile;
use blockhost_runtime::network::load_status;
use blockhost_runtime::pidfile::pid_exists;

use crate::bootstrap::CliContext;
use crate::presentation::{print_network_status, print_separator};

/// Print the recorded server PID and the last persisted network status.
pub fn execute(ctx: &CliContext) -> Result<()> {
    let pid_file = PidFile::new(ctx.paths.pid_file());
    println!("Data directory: {}", ctx.paths.root().display());

    match pid_file.read() {
        Ok(Some(pid)) if pid_exists(pid) => println!("Server:         running (pid {pid})"),
        Ok(Some(pid)) => {
            println!("Server:         not running (stale PID {pid}, run `blockhost cleanup`)");
        }
        Ok(None) => println!("Server:         not running"),
        Err(e) => println!("Server:         unknown ({e})"),
    }

    print_separator(48);
    match load_status(&ctx.paths.network_file()) {
        Some(status) => print_network_status(&status),
        None => println!("No network setup recorded yet. Run `blockhost network`."),
    }
    Ok(())
}
