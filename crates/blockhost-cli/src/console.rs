//! Interactive console: typed lines become server commands.
//!
//! stdin is read on a plain thread. A blocking read inside the tokio
//! runtime would keep the runtime from shutting down while the user types
//! nothing.

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;
use tracing::debug;

/// Spawn the stdin reader. The receiver yields trimmed, non-empty lines and
/// closes at end of input.
pub fn spawn_console_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = thread::Builder::new()
        .name("blockhost-console".to_string())
        .spawn(move || read_lines(io::stdin().lock(), &tx));
    if let Err(e) = spawned {
        debug!(error = %e, "Console reader not started");
    }
    rx
}

fn read_lines(input: impl BufRead, tx: &mpsc::Sender<String>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if tx.blocking_send(line.to_string()).is_err() {
            break;
        }
    }
    debug!("Console input closed");
}
