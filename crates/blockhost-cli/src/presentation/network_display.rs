//! Network status and setup output.

use blockhost_core::{NetworkStatus, StepOutcome};
use blockhost_runtime::NetworkSetup;

use super::tables::{format_optional, print_separator};

/// One-line summary of a provisioning step.
pub fn format_step(label: &str, outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Applied => format!("{label:<10} ok"),
        StepOutcome::Skipped { reason } => format!("{label:<10} skipped ({reason})"),
        StepOutcome::Failed { reason, .. } => format!("{label:<10} FAILED ({reason})"),
    }
}

/// Print the address table for a status.
pub fn print_network_status(status: &NetworkStatus) {
    let public = format_optional(status.public_ip.as_ref(), "unknown");
    let checked = status.last_checked.map_or_else(
        || "never".to_string(),
        |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    println!("LAN address:    {}:{}", status.lan_ip, status.port);
    println!("Public address: {public}:{}", status.port);
    println!("UPnP mapping:   {}", yes_no(status.upnp_success));
    println!("Reachable:      {} (checked {checked})", yes_no(status.reachable));
}

/// Print a setup report: addresses, step outcomes, then manual steps.
pub fn print_setup(setup: &NetworkSetup) {
    print_network_status(&setup.status);
    print_separator(48);
    println!("{}", format_step("UPnP", &setup.upnp));
    println!("{}", format_step("Firewall", &setup.firewall));
    print_manual_steps(&setup.manual_steps());
}

/// Print numbered manual steps, or nothing when there are none.
pub fn print_manual_steps(steps: &[String]) {
    if steps.is_empty() {
        return;
    }
    println!();
    println!("Some steps need to be done by hand:");
    for (i, step) in steps.iter().enumerate() {
        println!("  {:>2}. {step}", i + 1);
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
