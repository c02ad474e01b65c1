//! Commands enum for the blockhost CLI.

use clap::Subcommand;

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Expose the port, start the server, and attach a console
    Run {
        /// Game port (overrides config.json)
        #[arg(short, long)]
        port: Option<u16>,
        /// Do not request a UPnP port mapping
        #[arg(long)]
        no_upnp: bool,
        /// Do not change the host firewall
        #[arg(long)]
        no_firewall: bool,
    },

    /// Run network setup only and print what could not be automated
    Network {
        /// Game port (overrides config.json)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Remove the UPnP mapping and firewall rule
    Unexpose {
        /// Game port (overrides config.json)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show whether blockhost runs with administrator/root rights
    Elevation,

    /// Terminate a server left running by a previous session
    Cleanup,

    /// Show server and network status
    Status,
}
