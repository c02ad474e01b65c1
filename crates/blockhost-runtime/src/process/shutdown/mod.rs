//! Process termination by PID.
//!
//! Two strategies:
//! - `kill_pid`: graceful-then-forceful escalation for orphaned servers
//!   found through the PID file (async, bounded by a grace window)
//! - `force_kill_pid`: immediate, synchronous kill for exit hooks that
//!   cannot await anything

mod pid;

pub use pid::{force_kill_pid, kill_pid};
