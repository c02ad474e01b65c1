//! Core domain types and port definitions for blockhost.
//!
//! Nothing in this crate spawns processes or touches the network. The runtime
//! crate implements the ports declared here; the CLI wires them together.
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{NetworkStatus, OsKind, ServerConfig, StepOutcome};
pub use events::ServerEvent;
pub use paths::{DataPaths, PathError, data_root};
pub use ports::{
    CommandOutput, CommandRunner, MappingProtocol, PortMapper, PortMapping, PortMappingError,
};
pub use settings::{
    DEFAULT_JAR_NAME, DEFAULT_SERVER_PORT, Settings, SettingsError, validate_settings,
};
