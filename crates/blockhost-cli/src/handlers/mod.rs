//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Apply CLI flags on top of the loaded settings
//! - Call into blockhost-runtime
//! - Format output for the terminal via `presentation`

pub mod cleanup;
pub mod elevation;
pub mod network;
pub mod run;
pub mod status;
pub mod unexpose;

use blockhost_core::{Settings, validate_settings};

use crate::error::CliError;

/// Settings with the `--port` override applied and re-validated.
pub(crate) fn with_port(settings: &Settings, port: Option<u16>) -> Result<Settings, CliError> {
    let mut settings = settings.clone();
    if let Some(port) = port {
        settings.port = port;
    }
    validate_settings(&settings).map_err(|e| CliError::Config(e.to_string()))?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_override_is_validated() {
        let settings = Settings::default();
        assert_eq!(with_port(&settings, Some(25570)).unwrap().port, 25570);
        assert_eq!(with_port(&settings, None).unwrap().port, settings.port);

        let err = with_port(&settings, Some(0)).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }
}
