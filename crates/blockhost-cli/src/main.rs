//! CLI entry point - the composition root.
//!
//! This is the ONLY place where logging is initialised and commands are
//! dispatched. Handlers receive a `CliContext` built by `bootstrap`.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use blockhost_cli::handlers::run::RunOptions;
use blockhost_cli::{Cli, CliError, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads BLOCKHOST_HOME
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

/// Log to stderr so the server console on stdout stays readable.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(cli.data_dir.as_deref())?;

    match command {
        Commands::Run {
            port,
            no_upnp,
            no_firewall,
        } => {
            let opts = RunOptions {
                port,
                no_upnp,
                no_firewall,
            };
            handlers::run::execute(&ctx, opts).await?;
        }
        Commands::Network { port } => handlers::network::execute(&ctx, port).await?,
        Commands::Unexpose { port } => handlers::unexpose::execute(&ctx, port).await?,
        Commands::Elevation => handlers::elevation::execute(&ctx).await?,
        Commands::Cleanup => handlers::cleanup::execute(&ctx).await?,
        Commands::Status => handlers::status::execute(&ctx)?,
    }

    Ok(())
}
