//! Public address lookup through an IP-echo service.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

use crate::retry::is_transient_network_error;

#[derive(Debug, Error)]
pub enum PublicIpError {
    #[error("IP lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IP lookup service returned HTTP {0}")]
    Status(u16),

    #[error("IP lookup service returned an invalid address: {0:?}")]
    InvalidAddress(String),
}

impl PublicIpError {
    /// Network hiccups and 5xx are worth another attempt; bad payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => is_transient_network_error(e),
            Self::Status(code) => *code >= 500,
            Self::InvalidAddress(_) => false,
        }
    }
}

/// Ask `url` for this host's public address.
///
/// The service must answer with the bare address as plain text.
pub async fn fetch_public_ip(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<IpAddr, PublicIpError> {
    let response = client.get(url).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PublicIpError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    let trimmed = body.trim();
    trimmed
        .parse()
        .map_err(|_| PublicIpError::InvalidAddress(trimmed.chars().take(64).collect()))
}
