//! Router port-mapping port (UPnP IGD or equivalent).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::SocketAddrV4;
use thiserror::Error;

/// Transport protocol of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MappingProtocol {
    Tcp,
    Udp,
}

/// A forwarding rule on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub protocol: MappingProtocol,
    /// Port opened on the gateway's external interface.
    pub external_port: u16,
    /// LAN host and port the gateway forwards to.
    pub internal: SocketAddrV4,
    /// Lease in seconds; `0` requests a permanent mapping.
    pub lease_secs: u32,
    pub description: String,
}

/// Errors from a port-mapping backend.
///
/// All of these are expected in the field (no UPnP router, UPnP disabled,
/// conflicting mapping) and are downgraded to status flags by callers.
#[derive(Debug, Error)]
pub enum PortMappingError {
    #[error("No UPnP gateway found on the local network: {0}")]
    GatewayNotFound(String),

    #[error("Gateway rejected the request: {0}")]
    Rejected(String),

    #[error("Gateway request timed out")]
    Timeout,

    #[error("Gateway communication failed: {0}")]
    Io(String),
}

/// Capability interface over a router's port-mapping service.
#[async_trait]
pub trait PortMapper: Send + Sync {
    /// Ask the gateway to forward `mapping.external_port` to `mapping.internal`.
    async fn map(&self, mapping: &PortMapping) -> Result<(), PortMappingError>;

    /// Remove a mapping. Removing a mapping that does not exist is not an error.
    async fn unmap(&self, protocol: MappingProtocol, external_port: u16)
    -> Result<(), PortMappingError>;

    /// Enumerate the gateway's current mappings.
    async fn list_mappings(&self) -> Result<Vec<PortMapping>, PortMappingError>;
}
