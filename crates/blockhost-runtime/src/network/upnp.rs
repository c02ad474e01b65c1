//! UPnP IGD adapter for the `PortMapper` port.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use blockhost_core::{MappingProtocol, PortMapper, PortMapping, PortMappingError};
use igd_next::aio::tokio::search_gateway;
use igd_next::{
    GetGenericPortMappingEntryError, PortMappingProtocol, RemovePortError, SearchOptions,
};
use tracing::debug;

/// Upper bound on entries read by `list_mappings`; some routers never
/// report the end of the table.
const MAX_LISTED_MAPPINGS: u32 = 128;

/// Talks to the first Internet Gateway Device that answers SSDP discovery.
///
/// The gateway is rediscovered for every call: calls are rare and routers
/// drop idle control sessions.
#[derive(Debug, Clone)]
pub struct IgdPortMapper {
    search_timeout: Duration,
    request_timeout: Duration,
}

impl IgdPortMapper {
    pub const fn new(search_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            search_timeout,
            request_timeout,
        }
    }

    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            timeout: Some(self.search_timeout),
            ..SearchOptions::default()
        }
    }

    async fn bounded<T, E>(
        &self,
        request: impl Future<Output = Result<T, E>>,
    ) -> Result<Result<T, E>, PortMappingError> {
        tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| PortMappingError::Timeout)
    }
}

impl Default for IgdPortMapper {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(10))
    }
}

const fn to_igd(protocol: MappingProtocol) -> PortMappingProtocol {
    match protocol {
        MappingProtocol::Tcp => PortMappingProtocol::TCP,
        MappingProtocol::Udp => PortMappingProtocol::UDP,
    }
}

const fn from_igd(protocol: PortMappingProtocol) -> MappingProtocol {
    match protocol {
        PortMappingProtocol::TCP => MappingProtocol::Tcp,
        PortMappingProtocol::UDP => MappingProtocol::Udp,
    }
}

fn not_found(e: impl std::fmt::Display) -> PortMappingError {
    PortMappingError::GatewayNotFound(e.to_string())
}

#[async_trait]
impl PortMapper for IgdPortMapper {
    async fn map(&self, mapping: &PortMapping) -> Result<(), PortMappingError> {
        let gateway = search_gateway(self.search_options())
            .await
            .map_err(not_found)?;
        debug!(gateway = %gateway.addr, port = mapping.external_port, "Requesting port mapping");

        self.bounded(gateway.add_port(
            to_igd(mapping.protocol),
            mapping.external_port,
            SocketAddr::V4(mapping.internal),
            mapping.lease_secs,
            &mapping.description,
        ))
        .await?
        .map_err(|e| PortMappingError::Rejected(e.to_string()))
    }

    async fn unmap(
        &self,
        protocol: MappingProtocol,
        external_port: u16,
    ) -> Result<(), PortMappingError> {
        let gateway = search_gateway(self.search_options())
            .await
            .map_err(not_found)?;

        match self
            .bounded(gateway.remove_port(to_igd(protocol), external_port))
            .await?
        {
            Ok(()) => Ok(()),
            Err(RemovePortError::NoSuchPortMapping) => {
                debug!(port = external_port, "No mapping to remove");
                Ok(())
            }
            Err(e) => Err(PortMappingError::Rejected(e.to_string())),
        }
    }

    async fn list_mappings(&self) -> Result<Vec<PortMapping>, PortMappingError> {
        let gateway = search_gateway(self.search_options())
            .await
            .map_err(not_found)?;

        let mut mappings = Vec::new();
        for index in 0..MAX_LISTED_MAPPINGS {
            let entry = match self
                .bounded(gateway.get_generic_port_mapping_entry(index))
                .await?
            {
                Ok(entry) => entry,
                Err(GetGenericPortMappingEntryError::SpecifiedArrayIndexInvalid) => break,
                Err(e) => return Err(PortMappingError::Io(e.to_string())),
            };

            // Entries for non-IPv4 clients cannot be expressed in our model
            let Ok(client) = entry.internal_client.parse::<Ipv4Addr>() else {
                continue;
            };
            mappings.push(PortMapping {
                protocol: from_igd(entry.protocol),
                external_port: entry.external_port,
                internal: SocketAddrV4::new(client, entry.internal_port),
                lease_secs: entry.lease_duration,
                description: entry.port_mapping_description,
            });
        }

        Ok(mappings)
    }
}
