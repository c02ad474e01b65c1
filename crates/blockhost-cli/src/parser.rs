//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Run a Minecraft server for friends without touching the router.
#[derive(Parser, Debug)]
#[command(name = "blockhost")]
#[command(about = "Run and expose a Minecraft server")]
#[command(version)]
pub struct Cli {
    /// Data directory (PID file, logs, network status, config.json)
    #[arg(long = "data-dir", env = "BLOCKHOST_HOME", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
