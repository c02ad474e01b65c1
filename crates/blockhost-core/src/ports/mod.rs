//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the runtime expects from volatile
//! infrastructure: the router's UPnP service and the host's command shell.
//! They use only domain types so adapters can be swapped or faked.

mod command_runner;
mod port_mapper;

pub use command_runner::{CommandOutput, CommandRunner};
pub use port_mapper::{MappingProtocol, PortMapper, PortMapping, PortMappingError};
