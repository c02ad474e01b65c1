//! Run command handler.
//!
//! Exposes the port, starts the server, and stays attached until the server
//! exits or the process is told to terminate. Console lines are forwarded to
//! the server; a reachability check runs once the server reports ready.

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use blockhost_core::{OsKind, ServerEvent};
use blockhost_runtime::{
    EmergencyCleanup, NetworkProvisioner, ServerSupervisor, java_version, resolve_java,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::with_port;
use crate::bootstrap::CliContext;
use crate::console::spawn_console_reader;
use crate::error::CliError;
use crate::presentation::print_setup;
use crate::signals::{ShutdownSignals, install_exit_guards};

/// Flags of the run command.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub port: Option<u16>,
    pub no_upnp: bool,
    pub no_firewall: bool,
}

enum Detach {
    Signal(&'static str),
    Exited(Option<i32>),
}

/// Execute the run command.
pub async fn execute(ctx: &CliContext, opts: RunOptions) -> Result<()> {
    let mut settings = with_port(&ctx.settings, opts.port)?;
    if opts.no_upnp {
        settings.enable_upnp = false;
    }
    if opts.no_firewall {
        settings.configure_firewall = false;
    }

    let java = resolve_java(settings.java_path.as_deref()).map_err(CliError::from)?;
    match java_version(ctx.runner.as_ref(), &java).await {
        Some(version) => info!(java = %java.display(), %version, "Using Java runtime"),
        None => warn!(java = %java.display(), "Could not determine Java version"),
    }

    let provisioner = Arc::new(ctx.provisioner(&settings, Some(java.clone())));
    let setup = provisioner
        .setup_report(settings.port, OsKind::current())
        .await;
    print_setup(&setup);
    println!();

    let supervisor = Arc::new(ctx.supervisor());
    let cleanup = Arc::new(EmergencyCleanup::new(Arc::clone(&supervisor)));
    let _guard = install_exit_guards(Arc::clone(&cleanup));
    let mut signals = ShutdownSignals::install().context("Failed to install signal handlers")?;

    // Subscribe before starting so no event of the new process is missed
    let mut events = supervisor.subscribe();
    let config = settings.server_config(&ctx.paths, java);
    let handle = supervisor.start(&config).await.map_err(CliError::from)?;
    println!(
        "Server started (pid {}). Type server commands below, Ctrl+C to stop.",
        handle.pid
    );

    let mut console = spawn_console_reader();
    let mut console_open = true;
    let mut verification: Option<JoinHandle<()>> = None;

    let detach = loop {
        tokio::select! {
            name = signals.recv() => break Detach::Signal(name),
            event = events.recv() => match event {
                Ok(ServerEvent::Ready) => {
                    println!("Server is ready on port {}.", settings.port);
                    if let Some(ip) = setup.status.public_ip {
                        verification = Some(spawn_verification(
                            Arc::clone(&provisioner),
                            ip,
                            settings.port,
                        ));
                    }
                }
                Ok(ServerEvent::PlayerJoined { name }) => println!("{name} joined"),
                Ok(ServerEvent::PlayerLeft { name }) => println!("{name} left"),
                Ok(ServerEvent::Exited { code }) => break Detach::Exited(code),
                Ok(event) => debug!(?event, "Server event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event receiver lagged"),
                Err(RecvError::Closed) => break Detach::Exited(None),
            },
            line = console.recv(), if console_open => match line {
                Some(line) => forward(&supervisor, &line).await,
                None => console_open = false,
            },
        }
    };

    if let Some(task) = verification {
        task.abort();
    }

    match detach {
        Detach::Signal(name) => {
            info!(signal = name, "Shutting down");
            println!("Stopping server...");
            tokio::select! {
                _ = cleanup.run() => {}
                second = signals.recv() => {
                    warn!(signal = second, "Second signal received, killing server");
                    cleanup.run_sync();
                }
            }
            Ok(())
        }
        Detach::Exited(Some(0)) => {
            println!("Server stopped.");
            Ok(())
        }
        Detach::Exited(code) => {
            let reason = code.map_or_else(
                || "terminated by a signal".to_string(),
                |code| format!("exit code {code}"),
            );
            Err(CliError::Server(format!("Server exited unexpectedly ({reason})")).into())
        }
    }
}

async fn forward(supervisor: &ServerSupervisor, line: &str) {
    if !supervisor.send_command(line).await {
        warn!(command = line, "Server is not accepting commands");
    }
}

fn spawn_verification(provisioner: Arc<NetworkProvisioner>, ip: IpAddr, port: u16) -> JoinHandle<()> {
    tokio::spawn(async move {
        if provisioner.verify_when_settled(ip, port).await {
            println!("Reachable from the internet: friends can join at {ip}:{port}");
        } else {
            println!("Not reachable from the internet at {ip}:{port}.");
            println!("Check the manual steps above, or run `blockhost network` again.");
        }
    })
}
