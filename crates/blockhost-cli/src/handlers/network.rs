//! Network command handler.
//!
//! Runs the exposure steps without starting the server.

use anyhow::Result;
use blockhost_core::OsKind;
use blockhost_runtime::resolve_java;
use tracing::debug;

use super::with_port;
use crate::bootstrap::CliContext;
use crate::presentation::print_setup;

/// Execute the network command.
pub async fn execute(ctx: &CliContext, port: Option<u16>) -> Result<()> {
    let settings = with_port(&ctx.settings, port)?;

    // The macOS application firewall rule names the Java binary; without one
    // the firewall step reports manual steps instead.
    let java = match resolve_java(settings.java_path.as_deref()) {
        Ok(java) => Some(java),
        Err(e) => {
            debug!(error = %e, "No Java runtime for firewall rules");
            None
        }
    };

    let provisioner = ctx.provisioner(&settings, java);
    let setup = provisioner.setup_report(settings.port, OsKind::current()).await;
    print_setup(&setup);

    if let Some(ip) = setup.status.public_ip {
        println!();
        println!("Start the server with `blockhost run`; friends then connect to {ip}:{}", settings.port);
    }
    Ok(())
}
