//! LAN address detection.

use std::net::{IpAddr, Ipv4Addr};

use sysinfo::Networks;
use tracing::debug;

/// First non-loopback IPv4 address of this host, or loopback if none.
///
/// Interfaces are visited in name order so the choice is stable between runs.
pub fn detect_lan_ip() -> Ipv4Addr {
    let networks = Networks::new_with_refreshed_list();
    let mut interfaces: Vec<_> = networks.iter().collect();
    interfaces.sort_by(|a, b| a.0.cmp(b.0));

    let addresses = interfaces
        .into_iter()
        .flat_map(|(_, data)| data.ip_networks().iter().map(|net| net.addr));

    let lan_ip = select_lan_ip(addresses);
    debug!(%lan_ip, "LAN address selected");
    lan_ip
}

fn select_lan_ip(addresses: impl IntoIterator<Item = IpAddr>) -> Ipv4Addr {
    addresses
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_unspecified() => Some(v4),
            _ => None,
        })
        .unwrap_or(Ipv4Addr::LOCALHOST)
}
