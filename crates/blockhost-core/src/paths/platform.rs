//! Data root resolution.

use std::env;
use std::path::PathBuf;

use super::error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "BLOCKHOST_HOME";

/// Get the root directory for all blockhost state.
///
/// Resolution order:
/// 1. `BLOCKHOST_HOME` environment variable
/// 2. `~/.blockhost`
///
/// The directory is not created here; see [`super::DataPaths::ensure`].
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(DATA_DIR_ENV)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
    Ok(home.join(".blockhost"))
}
