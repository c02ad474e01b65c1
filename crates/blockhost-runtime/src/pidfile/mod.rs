//! PID file management for the supervised server process.
//!
//! The PID file is the durable shadow of the in-memory process handle: it
//! exists whenever a supervised process may be running, and lets a restarted
//! supervisor find and terminate a server it lost track of.
//!
//! # Safety guarantees
//! - Atomic writes via temp file + rename
//! - Unreadable or malformed files are treated as absent (and removed)
//! - Removal is idempotent

mod io;
mod sweep;
mod verify;

pub use io::PidFile;
pub use sweep::{OrphanOutcome, recover_orphan};
pub use verify::pid_exists;
