//! Best-effort internet exposure of the game port.
//!
//! `setup` walks a fixed sequence (LAN address, public address, UPnP
//! mapping, host firewall) where every step tolerates failure on its own.
//! Nothing here can fail server startup: failures become `StepOutcome`
//! values with manual instructions, and the resulting `NetworkStatus` is
//! persisted to `network.json`.

mod firewall;
mod lan;
mod public_ip;
mod reachability;
mod status;
mod upnp;

use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use blockhost_core::{
    CommandRunner, DataPaths, MappingProtocol, NetworkStatus, OsKind, PortMapper, PortMapping,
    PortMappingError, Settings, StepOutcome,
};
use tracing::{debug, info, warn};

use crate::elevation::{ElevationAdvisor, elevation_instructions};
use crate::retry::{RetryPolicy, is_transient_message, retry_with_backoff_if};

pub use firewall::{
    FirewallConfigurator, RULE_NAME, manual_firewall_steps, router_forwarding_steps,
};
pub use lan::detect_lan_ip;
pub use public_ip::{PublicIpError, fetch_public_ip};
pub use reachability::check_reachability;
pub use status::{load_status, save_status};
pub use upnp::IgdPortMapper;

/// Description attached to the UPnP mapping on the router.
const MAPPING_DESCRIPTION: &str = "blockhost Minecraft server";

/// Endpoints, switches, and time bounds for network provisioning.
#[derive(Debug, Clone)]
pub struct NetworkOptions {
    pub public_ip_url: String,
    pub reachability_url: String,
    pub public_ip_timeout: Duration,
    pub reachability_timeout: Duration,
    /// Wait between server readiness and the reachability check.
    pub settle_delay: Duration,
    pub firewall_timeout: Duration,
    /// Gateway discovery bound; individual gateway requests get twice this.
    pub upnp_timeout: Duration,
    pub enable_upnp: bool,
    pub configure_firewall: bool,
    /// Java runtime, needed by the macOS application firewall.
    pub java_path: Option<PathBuf>,
    /// Applied to the public IP lookup and the UPnP request.
    pub retry: RetryPolicy,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            public_ip_url: blockhost_core::settings::DEFAULT_PUBLIC_IP_URL.to_string(),
            reachability_url: blockhost_core::settings::DEFAULT_REACHABILITY_URL.to_string(),
            public_ip_timeout: Duration::from_secs(5),
            reachability_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(5),
            firewall_timeout: Duration::from_secs(15),
            upnp_timeout: Duration::from_secs(5),
            enable_upnp: true,
            configure_firewall: true,
            java_path: None,
            retry: RetryPolicy::default()
                .with_max_attempts(2)
                .with_initial_delay(Duration::from_millis(500)),
        }
    }
}

impl NetworkOptions {
    pub fn from_settings(settings: &Settings, java_path: Option<PathBuf>) -> Self {
        Self {
            public_ip_url: settings.public_ip_url.clone(),
            reachability_url: settings.reachability_url.clone(),
            enable_upnp: settings.enable_upnp,
            configure_firewall: settings.configure_firewall,
            java_path,
            ..Self::default()
        }
    }
}

/// Everything `setup` found out, step by step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSetup {
    pub status: NetworkStatus,
    pub upnp: StepOutcome,
    pub firewall: StepOutcome,
}

impl NetworkSetup {
    /// Manual steps replacing every failed automatic step, in order.
    pub fn manual_steps(&self) -> Vec<String> {
        self.upnp
            .manual_steps()
            .iter()
            .chain(self.firewall.manual_steps())
            .cloned()
            .collect()
    }
}

pub struct NetworkProvisioner {
    options: NetworkOptions,
    http: reqwest::Client,
    mapper: Arc<dyn PortMapper>,
    firewall: FirewallConfigurator,
    elevation: Arc<ElevationAdvisor>,
    status_file: PathBuf,
    current: Mutex<Option<NetworkStatus>>,
}

impl NetworkProvisioner {
    pub fn new(
        options: NetworkOptions,
        status_file: PathBuf,
        mapper: Arc<dyn PortMapper>,
        runner: Arc<dyn CommandRunner>,
        elevation: Arc<ElevationAdvisor>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("blockhost/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        let firewall = FirewallConfigurator::new(runner, options.firewall_timeout);

        Self {
            options,
            http,
            mapper,
            firewall,
            elevation,
            status_file,
            current: Mutex::new(None),
        }
    }

    /// Provisioner wired to the real router (UPnP IGD) and host tools.
    pub fn for_host(
        options: NetworkOptions,
        paths: &DataPaths,
        runner: Arc<dyn CommandRunner>,
        elevation: Arc<ElevationAdvisor>,
    ) -> Self {
        let mapper = Arc::new(IgdPortMapper::new(
            options.upnp_timeout,
            options.upnp_timeout * 2,
        ));
        Self::new(options, paths.network_file(), mapper, runner, elevation)
    }

    pub const fn options(&self) -> &NetworkOptions {
        &self.options
    }

    /// Expose `port` as far as possible and return the resulting status.
    ///
    /// `reachable` is always `false` here; see [`verify_reachability`](Self::verify_reachability).
    pub async fn setup(&self, port: u16, os: OsKind) -> NetworkStatus {
        self.setup_report(port, os).await.status
    }

    /// Like [`setup`](Self::setup), with the outcome of each step.
    pub async fn setup_report(&self, port: u16, os: OsKind) -> NetworkSetup {
        let lan_ip = detect_lan_ip();
        let mut status = NetworkStatus::new(lan_ip, port);

        status.public_ip = self.lookup_public_ip().await;

        let upnp = if self.options.enable_upnp {
            self.map_port(lan_ip, port).await
        } else {
            StepOutcome::skipped("UPnP is disabled in settings")
        };
        status.upnp_success = upnp.is_applied();

        let firewall = if self.options.configure_firewall {
            self.open_firewall(os, port).await
        } else {
            StepOutcome::skipped("Firewall configuration is disabled in settings")
        };

        info!(
            %lan_ip,
            public_ip = ?status.public_ip,
            port,
            upnp = status.upnp_success,
            firewall = firewall.is_applied(),
            "Network setup complete"
        );

        self.remember(status.clone());
        NetworkSetup {
            status,
            upnp,
            firewall,
        }
    }

    /// Ask the external service whether `ip:port` is reachable and record the answer.
    ///
    /// Never fails; any error reads as unreachable.
    pub async fn verify_reachability(&self, ip: IpAddr, port: u16) -> bool {
        let reachable = check_reachability(
            &self.http,
            &self.options.reachability_url,
            ip,
            port,
            self.options.reachability_timeout,
        )
        .await;

        if reachable {
            info!(%ip, port, "Server is reachable from the internet");
        } else {
            warn!(%ip, port, "Server is not reachable from the internet");
        }

        let mut status = self
            .status()
            .or_else(|| load_status(&self.status_file))
            .unwrap_or_else(|| NetworkStatus::new(Ipv4Addr::LOCALHOST, port));
        if status.port != port {
            debug!(
                recorded_port = status.port,
                port, "Recorded status is for another port, starting a new one"
            );
            let mut fresh = NetworkStatus::new(status.lan_ip, port);
            fresh.public_ip = Some(ip);
            status = fresh;
        }
        status.record_reachability(reachable);
        self.remember(status);

        reachable
    }

    /// Wait for the settle delay, then [`verify_reachability`](Self::verify_reachability).
    pub async fn verify_when_settled(&self, ip: IpAddr, port: u16) -> bool {
        tokio::time::sleep(self.options.settle_delay).await;
        self.verify_reachability(ip, port).await
    }

    /// Remove the UPnP mapping for `port`. Absent mappings and missing routers are fine.
    pub async fn remove_mapping(&self, port: u16) {
        match self.mapper.unmap(MappingProtocol::Tcp, port).await {
            Ok(()) => info!(port, "UPnP mapping removed"),
            Err(e) => debug!(port, error = %e, "UPnP mapping not removed"),
        }
    }

    /// Remove the firewall rule added by `setup`. Safe when none exists.
    pub async fn remove_firewall_rule(&self, os: OsKind, port: u16) {
        self.firewall
            .close_port(os, port, self.options.java_path.as_deref())
            .await;
        debug!(%os, port, "Firewall rule removal attempted");
    }

    /// The most recent status produced by this provisioner.
    pub fn status(&self) -> Option<NetworkStatus> {
        self.lock_current().clone()
    }

    /// The status persisted by any run, read from disk.
    pub fn load_status(&self) -> Option<NetworkStatus> {
        load_status(&self.status_file)
    }

    async fn lookup_public_ip(&self) -> Option<IpAddr> {
        let result = retry_with_backoff_if(
            &self.options.retry,
            || fetch_public_ip(&self.http, &self.options.public_ip_url, self.options.public_ip_timeout),
            PublicIpError::is_retryable,
        )
        .await;

        match result {
            Ok(ip) => {
                debug!(%ip, "Public address found");
                Some(ip)
            }
            Err(e) => {
                warn!(error = %e, "Could not determine public address");
                None
            }
        }
    }

    async fn map_port(&self, lan_ip: Ipv4Addr, port: u16) -> StepOutcome {
        let mapping = PortMapping {
            protocol: MappingProtocol::Tcp,
            external_port: port,
            internal: SocketAddrV4::new(lan_ip, port),
            lease_secs: 0,
            description: MAPPING_DESCRIPTION.to_string(),
        };

        let result = retry_with_backoff_if(
            &self.options.retry,
            || self.mapper.map(&mapping),
            is_retryable_mapping_error,
        )
        .await;

        match result {
            Ok(()) => {
                info!(%lan_ip, port, "UPnP port mapping created");
                StepOutcome::Applied
            }
            Err(e) => {
                warn!(port, error = %e, "UPnP port mapping failed");
                StepOutcome::failed(e.to_string(), router_forwarding_steps(lan_ip, port))
            }
        }
    }

    async fn open_firewall(&self, os: OsKind, port: u16) -> StepOutcome {
        if os == OsKind::Other {
            return StepOutcome::skipped(format!("Firewall configuration is not supported on {os}"));
        }

        let java = self.options.java_path.as_deref();
        if !self.elevation.is_elevated().await {
            warn!(%os, port, "Not running with elevated privileges, skipping firewall changes");
            let mut steps = manual_firewall_steps(os, port, java);
            steps.extend(elevation_instructions(os));
            return StepOutcome::failed("Administrator privileges are required", steps);
        }

        self.firewall.open_port(os, port, java).await
    }

    fn remember(&self, status: NetworkStatus) {
        if let Err(e) = save_status(&self.status_file, &status) {
            warn!(path = %self.status_file.display(), error = %e, "Failed to save network status");
        }
        *self.lock_current() = Some(status);
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<NetworkStatus>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_retryable_mapping_error(err: &PortMappingError) -> bool {
    match err {
        PortMappingError::Timeout | PortMappingError::Io(_) => true,
        PortMappingError::GatewayNotFound(_) | PortMappingError::Rejected(_) => {
            is_transient_message(&err.to_string())
        }
    }
}
