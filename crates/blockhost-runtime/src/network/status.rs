//! `network.json` persistence.

use std::fs;
use std::io;
use std::path::Path;

use blockhost_core::NetworkStatus;
use tracing::debug;

/// Write the status atomically (temp file + rename).
pub fn save_status(path: &Path, status: &NetworkStatus) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let json = serde_json::to_string_pretty(status).map_err(io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}

/// Read the persisted status; `None` if absent or unreadable.
pub fn load_status(path: &Path) -> Option<NetworkStatus> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Failed to read network status");
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(status) => Some(status),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Ignoring malformed network status");
            None
        }
    }
}
