//! Network exposure state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Durable view of how the game port is exposed.
///
/// Produced by the provisioner's setup pass, then updated once more when the
/// reachability check completes. Persisted as `network.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    #[serde(rename = "lanIP")]
    pub lan_ip: Ipv4Addr,
    #[serde(rename = "publicIP", default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<IpAddr>,
    pub port: u16,
    #[serde(rename = "upnpSuccess")]
    pub upnp_success: bool,
    pub reachable: bool,
    #[serde(rename = "lastChecked", default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl NetworkStatus {
    /// Fresh status; reachability is unknown until the server listens.
    pub const fn new(lan_ip: Ipv4Addr, port: u16) -> Self {
        Self {
            lan_ip,
            public_ip: None,
            port,
            upnp_success: false,
            reachable: false,
            last_checked: None,
        }
    }

    /// Record the outcome of a reachability check.
    pub fn record_reachability(&mut self, reachable: bool) {
        self.reachable = reachable;
        self.last_checked = Some(Utc::now());
    }
}

/// Result of a best-effort step.
///
/// Expected failures (no UPnP router, missing privileges) are values, not
/// errors: they carry the manual steps that replace the automatic one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StepOutcome {
    /// The step completed automatically.
    Applied,
    /// The step did not apply on this host or was disabled.
    Skipped { reason: String },
    /// The step was attempted and failed; the user should follow `manual_steps`.
    Failed {
        reason: String,
        manual_steps: Vec<String>,
    },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>, manual_steps: Vec<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            manual_steps,
        }
    }

    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Manual remediation text, empty unless the step failed.
    pub fn manual_steps(&self) -> &[String] {
        match self {
            Self::Failed { manual_steps, .. } => manual_steps,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_persisted_field_names() {
        let mut status = NetworkStatus::new(Ipv4Addr::new(192, 168, 1, 20), 25565);
        status.public_ip = Some("203.0.113.7".parse().unwrap());
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"lanIP\":\"192.168.1.20\""));
        assert!(json.contains("\"publicIP\":\"203.0.113.7\""));
        assert!(json.contains("\"upnpSuccess\":false"));
        assert!(!json.contains("lastChecked"));
    }

    #[test]
    fn status_reads_without_optional_fields() {
        let json = r#"{"lanIP":"10.0.0.4","port":25565,"upnpSuccess":true,"reachable":false}"#;
        let status: NetworkStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.public_ip, None);
        assert!(status.upnp_success);
        assert_eq!(status.last_checked, None);
    }

    #[test]
    fn recording_reachability_stamps_time() {
        let mut status = NetworkStatus::new(Ipv4Addr::LOCALHOST, 25565);
        status.record_reachability(true);
        assert!(status.reachable);
        assert!(status.last_checked.is_some());
    }

    #[test]
    fn only_failures_carry_manual_steps() {
        assert!(StepOutcome::Applied.manual_steps().is_empty());
        assert!(StepOutcome::skipped("disabled").manual_steps().is_empty());
        let failed = StepOutcome::failed("denied", vec!["open the port".to_string()]);
        assert_eq!(failed.manual_steps(), ["open the port".to_string()]);
    }
}
