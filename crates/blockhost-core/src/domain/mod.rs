//! Domain value types shared by the supervisor and the network provisioner.

mod network;
mod server;

pub use network::{NetworkStatus, StepOutcome};
pub use server::{OsKind, ServerConfig};
