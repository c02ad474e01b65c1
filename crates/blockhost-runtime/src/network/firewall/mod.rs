//! Host firewall mutation.
//!
//! Each platform has its own mechanism:
//! - Windows: a named inbound rule via `netsh advfirewall`
//! - macOS: per-application allow via `socketfilterfw` (ports are not a concept there)
//! - Linux: `iptables`, then `ufw` as a fallback
//!
//! Opening reports a [`StepOutcome`]; closing is idempotent and only logs.

mod instructions;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use blockhost_core::{CommandRunner, OsKind, StepOutcome};
use tracing::{debug, info, warn};

pub use instructions::{manual_firewall_steps, router_forwarding_steps};

/// Name of the Windows firewall rule owned by blockhost.
pub const RULE_NAME: &str = "Blockhost Minecraft Server";

const NETSH: &str = "netsh";
const SOCKETFILTERFW: &str = "/usr/libexec/ApplicationFirewall/socketfilterfw";
const IPTABLES: &str = "iptables";
const UFW: &str = "ufw";

pub struct FirewallConfigurator {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl FirewallConfigurator {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Allow inbound TCP on `port` (or, on macOS, inbound for `java`).
    pub async fn open_port(&self, os: OsKind, port: u16, java: Option<&Path>) -> StepOutcome {
        let outcome = match os {
            OsKind::Windows => self.open_windows(port).await,
            OsKind::MacOs => self.open_macos(java).await,
            OsKind::Linux => self.open_linux(port).await,
            OsKind::Other => Ok(()),
        };

        match outcome {
            Ok(()) if os == OsKind::Other => {
                StepOutcome::skipped(format!("Firewall configuration is not supported on {os}"))
            }
            Ok(()) => {
                info!(%os, port, "Firewall configured");
                StepOutcome::Applied
            }
            Err(reason) => {
                warn!(%os, port, %reason, "Firewall configuration failed");
                StepOutcome::failed(reason, manual_firewall_steps(os, port, java))
            }
        }
    }

    /// Remove what [`open_port`](Self::open_port) added. Safe when nothing was added.
    pub async fn close_port(&self, os: OsKind, port: u16, java: Option<&Path>) {
        match os {
            OsKind::Windows => {
                self.run_logged(NETSH, windows_delete_args()).await;
            }
            OsKind::MacOs => {
                if let Some(java) = java {
                    self.run_logged(SOCKETFILTERFW, vec!["--remove".to_string(), path_arg(java)])
                        .await;
                }
            }
            OsKind::Linux => {
                self.run_logged(IPTABLES, iptables_args("-D", port)).await;
                self.run_logged(UFW, vec!["delete".into(), "allow".into(), format!("{port}/tcp")])
                    .await;
            }
            OsKind::Other => {}
        }
    }

    async fn open_windows(&self, port: u16) -> Result<(), String> {
        // Replace any rule left by an earlier run (possibly for another port)
        self.run_logged(NETSH, windows_delete_args()).await;

        self.run_checked(
            NETSH,
            vec![
                "advfirewall".into(),
                "firewall".into(),
                "add".into(),
                "rule".into(),
                format!("name={RULE_NAME}"),
                "dir=in".into(),
                "action=allow".into(),
                "protocol=TCP".into(),
                format!("localport={port}"),
            ],
        )
        .await
    }

    async fn open_macos(&self, java: Option<&Path>) -> Result<(), String> {
        let Some(java) = java else {
            return Err("Java runtime path is unknown".to_string());
        };
        let java = path_arg(java);

        self.run_checked(SOCKETFILTERFW, vec!["--add".into(), java.clone()])
            .await?;
        self.run_checked(SOCKETFILTERFW, vec!["--unblockapp".into(), java])
            .await
            // SIP can refuse this even for root
            .map_err(|e| format!("{e} (System Integrity Protection may prevent this)"))
    }

    async fn open_linux(&self, port: u16) -> Result<(), String> {
        if self.run_checked(IPTABLES, iptables_args("-C", port)).await.is_ok() {
            debug!(port, "iptables rule already present");
            return Ok(());
        }

        let iptables_err = match self.run_checked(IPTABLES, iptables_args("-A", port)).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        debug!(port, error = %iptables_err, "iptables failed, trying ufw");

        self.run_checked(UFW, vec!["allow".into(), format!("{port}/tcp")])
            .await
            .map_err(|ufw_err| format!("iptables: {iptables_err}; ufw: {ufw_err}"))
    }

    /// Run a command; `Err` carries a readable reason when it fails or exits non-zero.
    async fn run_checked(&self, program: &str, args: Vec<String>) -> Result<(), String> {
        match self.runner.run(program, &args, self.timeout).await {
            Ok(output) if output.success => Ok(()),
            Ok(output) => Err(format!("{program}: {}", output.failure_detail())),
            Err(e) => Err(format!("{program}: {e}")),
        }
    }

    async fn run_logged(&self, program: &str, args: Vec<String>) {
        if let Err(reason) = self.run_checked(program, args).await {
            debug!(%reason, "Ignoring firewall cleanup failure");
        }
    }
}

fn windows_delete_args() -> Vec<String> {
    vec![
        "advfirewall".into(),
        "firewall".into(),
        "delete".into(),
        "rule".into(),
        format!("name={RULE_NAME}"),
    ]
}

fn iptables_args(action: &str, port: u16) -> Vec<String> {
    [action, "INPUT", "-p", "tcp", "--dport", &port.to_string(), "-j", "ACCEPT"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
