//! Shutdown signals and last-resort cleanup hooks.

use std::io;
use std::panic;
use std::sync::Arc;

use blockhost_runtime::EmergencyCleanup;

/// Termination signals the CLI reacts to.
pub struct ShutdownSignals {
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sighup: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigquit: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    /// Register the handlers. Must be called inside the tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
            sigquit: signal(SignalKind::quit())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next termination signal and return its name.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sighup.recv() => "SIGHUP",
            _ = self.sigquit.recv() => "SIGQUIT",
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "Ctrl+C"
    }
}

/// Runs synchronous emergency cleanup when dropped, and on panic.
pub struct ExitGuard {
    cleanup: Arc<EmergencyCleanup>,
}

/// Install a panic hook that kills the server before the previous hook runs.
///
/// The returned guard does the same when it goes out of scope at the end of `main`.
pub fn install_exit_guards(cleanup: Arc<EmergencyCleanup>) -> ExitGuard {
    let previous = panic::take_hook();
    let on_panic = Arc::clone(&cleanup);
    panic::set_hook(Box::new(move |info| {
        on_panic.run_sync();
        previous(info);
    }));
    ExitGuard { cleanup }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.cleanup.run_sync();
    }
}
