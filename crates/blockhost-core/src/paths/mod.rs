//! Path utilities for blockhost's data directory.
//!
//! Every persisted artifact (PID file, network status, dated server logs,
//! settings) lives under a single configurable root. `DataPaths` derives the
//! individual locations so nothing else hard-codes file names.

mod error;
mod layout;
mod platform;

pub use error::PathError;
pub use layout::DataPaths;
pub use platform::{DATA_DIR_ENV, data_root};
