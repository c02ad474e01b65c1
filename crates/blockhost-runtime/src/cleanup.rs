//! Last-chance teardown when the hosting process is going away.
//!
//! Two entry points share one state flag:
//! - [`EmergencyCleanup::run`]: graceful stop, forced kill if that stalls
//!   (signal handlers)
//! - [`EmergencyCleanup::run_sync`]: immediate kill, no awaiting (panic hook,
//!   end of `main`)
//!
//! Overlapping signals (SIGINT right after SIGTERM) run the async form once.
//! The sync form still kills when the async form is mid-flight, since the
//! process may be exiting underneath it, and does nothing once teardown finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::process::ServerSupervisor;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

pub struct EmergencyCleanup {
    supervisor: Arc<ServerSupervisor>,
    state: AtomicU8,
    stop_bound: Duration,
}

impl EmergencyCleanup {
    pub fn new(supervisor: Arc<ServerSupervisor>) -> Self {
        Self {
            supervisor,
            state: AtomicU8::new(IDLE),
            stop_bound: Duration::from_secs(45),
        }
    }

    /// Upper bound on the graceful part of [`run`](Self::run).
    #[must_use]
    pub const fn with_stop_bound(mut self, bound: Duration) -> Self {
        self.stop_bound = bound;
        self
    }

    /// `true` once either form has started.
    pub fn is_in_progress(&self) -> bool {
        self.state.load(Ordering::SeqCst) != IDLE
    }

    /// Stop the server gracefully, killing it if that does not finish in time.
    ///
    /// Returns `false` without doing anything if cleanup already started.
    pub async fn run(&self) -> bool {
        if self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Emergency cleanup already in progress");
            return false;
        }

        info!("Emergency cleanup: stopping server");
        let graceful = tokio::time::timeout(self.stop_bound, async {
            self.supervisor.stop().await;
            // Covers a stop issued by someone else that our call deferred to
            self.supervisor.wait_for_exit().await;
        })
        .await;

        if graceful.is_err() || self.supervisor.is_running() {
            warn!("Graceful stop did not complete, force-killing server");
            self.supervisor.kill_now();
        } else if let Err(e) = self.supervisor.pid_file().remove() {
            warn!(error = %e, "Failed to remove PID file");
        }

        self.state.store(DONE, Ordering::SeqCst);
        true
    }

    /// Kill the server immediately and delete the PID file.
    ///
    /// For contexts that cannot await. Returns `false` if cleanup already
    /// completed.
    pub fn run_sync(&self) -> bool {
        if self.state.swap(DONE, Ordering::SeqCst) == DONE {
            return false;
        }

        match self.supervisor.kill_now() {
            Some(pid) => warn!(pid, "Emergency cleanup killed the server"),
            None => debug!("Emergency cleanup: no server running"),
        }
        true
    }
}
