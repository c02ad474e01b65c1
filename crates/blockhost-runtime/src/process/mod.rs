//! Game server process supervision.
//!
//! This module owns the single server child process: launch, output capture,
//! console input, graceful stop with forced-kill fallback, and exit cleanup.
//!
//! Secondary concerns live in their own submodules:
//! - `logs` / `stream`: output capture into a ring buffer and a dated log file
//! - `parse`: recognition of ready / join / leave lines
//! - `broadcaster`: lifecycle event fan-out
//! - `shutdown`: termination by PID for orphans and exit hooks

mod broadcaster;
mod error;
mod logs;
mod parse;
pub mod shutdown;
mod stream;
mod supervisor;
mod types;

pub use broadcaster::ServerEventBroadcaster;
pub use error::SupervisorError;
pub use logs::{ServerLogEntry, ServerLogManager};
pub use parse::parse_log_line;
pub use supervisor::{ServerProcessHandle, ServerSupervisor};
pub use types::{PlayerRoster, SupervisorOptions};
