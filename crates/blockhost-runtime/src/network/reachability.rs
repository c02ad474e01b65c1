//! External reachability check.
//!
//! The check service is queried as `GET <url>?host=<ip>&port=<port>` and
//! answers in text (or JSON text) saying whether the port is open.

use std::net::IpAddr;
use std::time::Duration;

use tracing::{debug, warn};

/// Whether `ip:port` accepts inbound connections from the internet.
///
/// Never fails: transport errors, timeouts, and non-2xx responses all count
/// as unreachable.
pub async fn check_reachability(
    client: &reqwest::Client,
    url: &str,
    ip: IpAddr,
    port: u16,
    timeout: Duration,
) -> bool {
    let host = ip.to_string();
    let port_param = port.to_string();
    let request = client
        .get(url)
        .query(&[("host", host.as_str()), ("port", port_param.as_str())])
        .timeout(timeout);

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(%ip, port, error = %e, "Reachability check failed");
            return false;
        }
    };

    if !response.status().is_success() {
        warn!(%ip, port, status = %response.status(), "Reachability service returned an error");
        return false;
    }

    match response.text().await {
        Ok(body) => {
            let reachable = interpret_response(&body);
            debug!(%ip, port, reachable, "Reachability check complete");
            reachable
        }
        Err(e) => {
            warn!(%ip, port, error = %e, "Failed to read reachability response");
            false
        }
    }
}

const NEGATIVE_ANSWERS: &[&str] = &["unreachable", "not reachable", "not open", "closed", "filtered"];

/// "open"/"reachable" means success; explicit negatives win over both.
fn interpret_response(body: &str) -> bool {
    let lower = body.to_lowercase();
    if NEGATIVE_ANSWERS.iter().any(|neg| lower.contains(neg)) {
        return false;
    }
    lower.contains("open") || lower.contains("reachable")
}
