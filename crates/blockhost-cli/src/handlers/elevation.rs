//! Elevation command handler.

use anyhow::Result;
use blockhost_core::OsKind;

use crate::bootstrap::CliContext;
use crate::presentation::print_manual_steps;

/// Print whether firewall changes are possible, and how to make them possible.
pub async fn execute(ctx: &CliContext) -> Result<()> {
    let os = OsKind::current();
    if ctx.elevation.is_elevated().await {
        println!("Running with elevated privileges on {os}; firewall rules can be added.");
        return Ok(());
    }

    println!("Not running with elevated privileges on {os}.");
    println!("Firewall rules cannot be added automatically.");
    print_manual_steps(&ctx.elevation.instructions(os));
    Ok(())
}
