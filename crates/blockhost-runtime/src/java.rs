//! Java runtime discovery.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blockhost_core::CommandRunner;
use tracing::{debug, warn};

use crate::process::SupervisorError;
use crate::system::first_output_line;

const JAVA_HOME_ENV: &str = "JAVA_HOME";

fn java_binary_name() -> String {
    format!("java{}", env::consts::EXE_SUFFIX)
}

/// Locate the Java runtime.
///
/// Order: the explicitly configured path, then `$JAVA_HOME/bin/java`, then
/// `java` on `PATH`.
pub fn resolve_java(explicit: Option<&Path>) -> Result<PathBuf, SupervisorError> {
    let java_home = env::var_os(JAVA_HOME_ENV).map(PathBuf::from);
    resolve_java_with(explicit, java_home.as_deref(), || {
        which::which(java_binary_name()).ok()
    })
}

fn resolve_java_with(
    explicit: Option<&Path>,
    java_home: Option<&Path>,
    search_path: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf, SupervisorError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        warn!(path = %path.display(), "Configured Java runtime does not exist, searching elsewhere");
    }

    if let Some(home) = java_home {
        let candidate = home.join("bin").join(java_binary_name());
        if candidate.is_file() {
            debug!(path = %candidate.display(), "Using Java from JAVA_HOME");
            return Ok(candidate);
        }
        debug!(path = %candidate.display(), "JAVA_HOME does not contain a Java binary");
    }

    search_path().ok_or_else(|| SupervisorError::JavaNotFound {
        reason: format!(
            "no Java runtime configured, in {JAVA_HOME_ENV}, or on PATH. Install Java 17 or newer."
        ),
    })
}

/// Version banner of a Java runtime (`java -version`), if it runs.
pub async fn java_version(runner: &dyn CommandRunner, java: &Path) -> Option<String> {
    let program = java.to_string_lossy();
    match runner
        .run(&program, &["-version".to_string()], Duration::from_secs(10))
        .await
    {
        Ok(output) if output.success => first_output_line(&output),
        Ok(output) => {
            debug!(java = %program, detail = %output.failure_detail(), "java -version failed");
            None
        }
        Err(e) => {
            debug!(java = %program, error = %e, "Failed to run java -version");
            None
        }
    }
}
