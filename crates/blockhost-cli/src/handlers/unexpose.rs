//! Unexpose command handler.

use anyhow::Result;
use blockhost_core::OsKind;
use blockhost_runtime::resolve_java;

use super::with_port;
use crate::bootstrap::CliContext;

/// Remove the UPnP mapping and firewall rule. Safe to repeat.
pub async fn execute(ctx: &CliContext, port: Option<u16>) -> Result<()> {
    let settings = with_port(&ctx.settings, port)?;
    let java = resolve_java(settings.java_path.as_deref()).ok();
    let provisioner = ctx.provisioner(&settings, java);

    provisioner.remove_mapping(settings.port).await;
    provisioner
        .remove_firewall_rule(OsKind::current(), settings.port)
        .await;

    println!("Port {} is no longer exposed by blockhost.", settings.port);
    Ok(())
}
