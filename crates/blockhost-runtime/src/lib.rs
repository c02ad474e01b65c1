//! Process supervision and network exposure for blockhost.
//!
//! - [`ServerSupervisor`]: launches, watches, and stops the game server
//! - [`NetworkProvisioner`]: UPnP, firewall, public IP, and reachability
//! - [`ElevationAdvisor`]: privilege detection and guidance
//! - [`EmergencyCleanup`]: teardown from signal handlers and exit hooks
//! - [`retry`]: bounded exponential backoff for flaky network calls
#![deny(unsafe_code)]

pub mod cleanup;
pub mod elevation;
pub mod java;
pub mod network;
pub mod pidfile;
pub mod process;
pub mod retry;
pub mod system;

#[cfg(test)]
mod test_support;

pub use cleanup::EmergencyCleanup;
pub use elevation::{ElevationAdvisor, elevation_instructions};
pub use java::{java_version, resolve_java};
pub use network::{NetworkOptions, NetworkProvisioner, NetworkSetup};
pub use pidfile::{OrphanOutcome, PidFile, recover_orphan};
pub use process::{
    ServerLogEntry, ServerProcessHandle, ServerSupervisor, SupervisorError, SupervisorOptions,
};
pub use retry::{RetryPolicy, retry_with_backoff, retry_with_backoff_if};
pub use system::SystemCommandRunner;
