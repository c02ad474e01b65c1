//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Data layout and settings (via blockhost-core)
//! - External command runner and elevation probe (via blockhost-runtime)
//! - Supervisor and network provisioner, built on demand by handlers
//!
//! Command handlers receive the composed `CliContext`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use blockhost_core::{CommandRunner, DataPaths, Settings, validate_settings};
use blockhost_runtime::{
    ElevationAdvisor, NetworkOptions, NetworkProvisioner, ServerSupervisor, SupervisorOptions,
    SystemCommandRunner,
};
use tracing::{debug, info};

use crate::error::CliError;

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// Where blockhost keeps its files.
    pub paths: DataPaths,
    /// Settings loaded from `config.json` (defaults when absent).
    pub settings: Settings,
    /// Runner for external OS tools.
    pub runner: Arc<dyn CommandRunner>,
    /// Shared elevation probe; its answer is cached for the session.
    pub elevation: Arc<ElevationAdvisor>,
}

impl CliContext {
    /// Network provisioner for this host and data root.
    pub fn provisioner(&self, settings: &Settings, java: Option<PathBuf>) -> NetworkProvisioner {
        NetworkProvisioner::for_host(
            NetworkOptions::from_settings(settings, java),
            &self.paths,
            Arc::clone(&self.runner),
            Arc::clone(&self.elevation),
        )
    }

    /// Supervisor bound to this data root.
    pub fn supervisor(&self) -> ServerSupervisor {
        ServerSupervisor::new(self.paths.clone(), SupervisorOptions::default())
    }
}

/// Bootstrap the CLI application.
///
/// Resolves the data root (explicit directory, else `BLOCKHOST_HOME`, else
/// `~/.blockhost`), creates it, loads and validates settings, and writes a
/// default `config.json` on first use.
pub fn bootstrap(data_dir: Option<&Path>) -> Result<CliContext> {
    let paths = match data_dir {
        Some(dir) => DataPaths::new(dir),
        None => DataPaths::from_env().map_err(|e| CliError::Config(e.to_string()))?,
    };
    paths
        .ensure()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let config_file = paths.config_file();
    let settings =
        Settings::load(&config_file).map_err(|e| CliError::Config(e.to_string()))?;
    validate_settings(&settings).map_err(|e| CliError::Config(e.to_string()))?;

    if !config_file.exists() {
        settings
            .save(&config_file)
            .map_err(|e| CliError::Config(e.to_string()))?;
        info!(path = %config_file.display(), "Wrote default settings");
    }
    debug!(root = %paths.root().display(), "Data root ready");

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());
    let elevation = Arc::new(ElevationAdvisor::new(Arc::clone(&runner)));

    Ok(CliContext {
        paths,
        settings,
        runner,
        elevation,
    })
}
