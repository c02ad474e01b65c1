//! Manual remediation text shown when automatic configuration fails.

use std::net::Ipv4Addr;
use std::path::Path;

use blockhost_core::OsKind;

use super::RULE_NAME;

/// Steps for opening `port` in the host firewall by hand.
pub fn manual_firewall_steps(os: OsKind, port: u16, java: Option<&Path>) -> Vec<String> {
    match os {
        OsKind::Windows => vec![
            "Open the Start menu and search for \"Windows Defender Firewall with Advanced Security\".".to_string(),
            "Select \"Inbound Rules\" in the left pane, then \"New Rule...\" in the right pane.".to_string(),
            "Choose \"Port\" and click Next.".to_string(),
            format!("Choose \"TCP\", enter {port} under \"Specific local ports\", and click Next."),
            "Choose \"Allow the connection\" and click Next.".to_string(),
            "Keep Domain, Private, and Public checked and click Next.".to_string(),
            format!("Name the rule \"{RULE_NAME}\" and click Finish."),
        ],
        OsKind::MacOs => {
            let java = java.map_or_else(
                || "your Java runtime".to_string(),
                |p| p.display().to_string(),
            );
            vec![
                "Open System Settings > Network > Firewall.".to_string(),
                "Click \"Options...\".".to_string(),
                format!("Click \"+\" and add {java}."),
                "Set it to \"Allow incoming connections\" and click OK.".to_string(),
            ]
        }
        OsKind::Linux => vec![
            "Open a terminal and run ONE of the following:".to_string(),
            format!("  sudo iptables -A INPUT -p tcp --dport {port} -j ACCEPT"),
            format!("  sudo ufw allow {port}/tcp"),
        ],
        OsKind::Other => vec![format!(
            "Allow inbound TCP connections on port {port} in your firewall."
        )],
    }
}

/// Steps for forwarding `port` on the router to this machine by hand.
pub fn router_forwarding_steps(lan_ip: Ipv4Addr, port: u16) -> Vec<String> {
    vec![
        "Open your router's admin page (often http://192.168.0.1 or http://192.168.1.1).".to_string(),
        "Sign in; the credentials are usually printed on the router.".to_string(),
        "Find \"Port Forwarding\" (sometimes under \"NAT\", \"Virtual Servers\", or \"Advanced\").".to_string(),
        format!("Add a rule forwarding external TCP port {port} to {lan_ip} port {port}."),
        "Save the rule and restart the server.".to_string(),
    ]
}
