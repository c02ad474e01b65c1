//! Privilege detection and guidance.
//!
//! Firewall changes need administrator (Windows) or root (Unix) rights. The
//! advisor answers whether this process has them, caching the answer since
//! the Windows probe shells out.

use std::env;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use blockhost_core::{CommandRunner, OsKind};
use tracing::debug;

/// Environment markers set by `sudo` for the commands it runs.
const SUDO_MARKERS: &[&str] = &["SUDO_UID", "SUDO_USER"];

/// Probe timeout for the Windows session check.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ElevationAdvisor {
    runner: Arc<dyn CommandRunner>,
    os: OsKind,
    cached: Mutex<Option<bool>>,
}

impl ElevationAdvisor {
    /// Advisor for the host OS.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::for_os(runner, OsKind::current())
    }

    pub fn for_os(runner: Arc<dyn CommandRunner>, os: OsKind) -> Self {
        Self {
            runner,
            os,
            cached: Mutex::new(None),
        }
    }

    /// Whether the process runs with administrator/root privileges.
    ///
    /// Probed once, then cached until [`clear_cache`](Self::clear_cache).
    pub async fn is_elevated(&self) -> bool {
        if let Some(elevated) = *self.lock() {
            return elevated;
        }

        let elevated = self.probe().await;
        debug!(os = %self.os, elevated, "Elevation probed");
        *self.lock() = Some(elevated);
        elevated
    }

    pub fn clear_cache(&self) {
        *self.lock() = None;
    }

    /// Steps for re-running with privileges on `os`.
    pub fn instructions(&self, os: OsKind) -> Vec<String> {
        elevation_instructions(os)
    }

    async fn probe(&self) -> bool {
        match self.os {
            // `net session` needs an administrator token
            OsKind::Windows => match self
                .runner
                .run("net", &["session".to_string()], PROBE_TIMEOUT)
                .await
            {
                Ok(output) => output.success,
                Err(e) => {
                    debug!(error = %e, "Elevation probe failed to run");
                    false
                }
            },
            OsKind::MacOs | OsKind::Linux | OsKind::Other => {
                effective_uid_is_root() || SUDO_MARKERS.iter().any(|key| env::var_os(key).is_some())
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<bool>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(unix)]
fn effective_uid_is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn effective_uid_is_root() -> bool {
    false
}

/// How to run blockhost with elevated privileges on `os`.
pub fn elevation_instructions(os: OsKind) -> Vec<String> {
    let steps: &[&str] = match os {
        OsKind::Windows => &[
            "Close blockhost.",
            "Open the Start menu and type \"cmd\" or \"PowerShell\".",
            "Right-click the result and choose \"Run as administrator\".",
            "Confirm the User Account Control prompt.",
            "Run blockhost again from that window.",
        ],
        OsKind::MacOs => &[
            "Close blockhost.",
            "Open Terminal (Applications > Utilities > Terminal).",
            "Run: sudo blockhost run",
            "Enter your account password when asked.",
            "If the firewall change is still refused, System Integrity Protection may block it; use the manual System Settings steps instead.",
        ],
        OsKind::Linux => &[
            "Close blockhost.",
            "Run: sudo blockhost run",
            "Enter your password when asked.",
            "Alternatively run the firewall commands shown above yourself with sudo.",
        ],
        OsKind::Other => &[
            "Run blockhost as a user allowed to change firewall settings, or open the port manually.",
        ],
    };
    steps.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockRunner, failed, invoked, succeeded};
    use std::io;

    #[tokio::test]
    async fn windows_probe_uses_net_session_and_caches() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|program, args, _| invoked(program, args, "net session"))
            .times(1)
            .returning(|_, _, _| succeeded());

        let advisor = ElevationAdvisor::for_os(Arc::new(runner), OsKind::Windows);
        assert!(advisor.is_elevated().await);
        assert!(advisor.is_elevated().await);
    }

    #[tokio::test]
    async fn clearing_cache_probes_again() {
        let mut runner = MockRunner::new();
        let mut seq = mockall::Sequence::new();
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| failed("Access is denied."));
        runner
            .expect_run()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| succeeded());

        let advisor = ElevationAdvisor::for_os(Arc::new(runner), OsKind::Windows);
        assert!(!advisor.is_elevated().await);
        advisor.clear_cache();
        assert!(advisor.is_elevated().await);
    }

    #[tokio::test]
    async fn windows_probe_failure_means_not_elevated() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .returning(|_, _, _| Err(io::Error::from(io::ErrorKind::NotFound)));

        let advisor = ElevationAdvisor::for_os(Arc::new(runner), OsKind::Windows);
        assert!(!advisor.is_elevated().await);
    }

    #[tokio::test]
    async fn unix_probe_never_shells_out() {
        let mut runner = MockRunner::new();
        runner.expect_run().never();

        let advisor = ElevationAdvisor::for_os(Arc::new(runner), OsKind::Linux);
        let _ = advisor.is_elevated().await;
    }

    #[test]
    fn every_platform_has_instructions() {
        for os in [OsKind::Windows, OsKind::MacOs, OsKind::Linux, OsKind::Other] {
            assert!(!elevation_instructions(os).is_empty(), "{os}");
        }
        assert!(
            elevation_instructions(OsKind::Windows)
                .iter()
                .any(|s| s.contains("Run as administrator"))
        );
    }
}
