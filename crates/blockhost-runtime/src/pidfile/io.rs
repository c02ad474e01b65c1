//! Atomic PID file I/O operations.
//!
//! Format: a single line holding the decimal PID.
//! ```text
//! <pid>
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Handle to the PID file at a fixed location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the PID atomically using temp file + rename.
    pub fn write(&self, pid: u32) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, format!("{pid}\n"))?;
        fs::rename(&temp_path, &self.path)
    }

    /// Read the recorded PID.
    ///
    /// Returns `Ok(None)` when the file is missing. A file whose content is
    /// not a positive integer is removed and reported as `None`.
    pub fn read(&self) -> io::Result<Option<u32>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        match parse_pid(&content) {
            Some(pid) => Ok(Some(pid)),
            None => {
                warn!(path = %self.path.display(), "Malformed PID file, removing");
                self.remove()?;
                Ok(None)
            }
        }
    }

    /// Delete the PID file (idempotent - no error if missing).
    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Delete the PID file only if it still records `pid`.
    ///
    /// Returns `Ok(false)` when the file is missing or belongs to another process.
    pub fn remove_if_owned(&self, pid: u32) -> io::Result<bool> {
        if self.read()? != Some(pid) {
            return Ok(false);
        }
        self.remove()?;
        Ok(true)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

fn parse_pid(content: &str) -> Option<u32> {
    content
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<u32>().ok())
        .filter(|pid| *pid > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_pidfile() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path().join("server.pid"));

        pid_file.write(98765).expect("write failed");
        assert!(pid_file.exists());
        assert_eq!(fs::read_to_string(pid_file.path()).unwrap(), "98765\n");
        assert_eq!(pid_file.read().unwrap(), Some(98765));

        pid_file.remove().expect("delete failed");
        assert!(!pid_file.exists());

        // Second delete should be idempotent
        pid_file.remove().expect("second delete failed");
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path().join("server.pid"));
        assert_eq!(pid_file.read().unwrap(), None);
    }

    #[test]
    fn malformed_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path().join("server.pid"));
        fs::write(pid_file.path(), "not-a-pid").unwrap();

        assert_eq!(pid_file.read().unwrap(), None);
        assert!(!pid_file.exists());
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path().join("server.pid"));
        fs::write(pid_file.path(), "  4242 \r\n").unwrap();
        assert_eq!(pid_file.read().unwrap(), Some(4242));
    }

    #[test]
    fn remove_if_owned_leaves_other_pids_alone() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path().join("server.pid"));
        pid_file.write(200).unwrap();

        assert!(!pid_file.remove_if_owned(100).unwrap());
        assert_eq!(pid_file.read().unwrap(), Some(200));

        assert!(pid_file.remove_if_owned(200).unwrap());
        assert!(!pid_file.exists());
        assert!(!pid_file.remove_if_owned(200).unwrap());
    }

    #[test]
    fn write_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path().join("a").join("b").join("server.pid"));
        pid_file.write(7).unwrap();
        assert_eq!(pid_file.read().unwrap(), Some(7));
    }
}
