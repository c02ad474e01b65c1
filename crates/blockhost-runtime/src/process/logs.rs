//! Captured server output: in-memory ring buffer and dated log file.

use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Maximum number of log lines to keep in the ring buffer
const MAX_LOG_LINES: usize = 5000;

/// A single captured output line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerLogEntry {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// `stdout` or `stderr`
    pub stream: &'static str,
    /// The log line content (without trailing newline)
    pub line: String,
}

impl ServerLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(stream: &'static str, line: String) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            stream,
            line,
        }
    }
}

/// Ring buffer storing recent log lines
#[derive(Debug, Default)]
struct LogBuffer {
    lines: VecDeque<ServerLogEntry>,
}

impl LogBuffer {
    /// Add a log entry, removing oldest if at capacity
    fn push(&mut self, entry: ServerLogEntry) {
        if self.lines.len() >= MAX_LOG_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(entry);
    }

    fn last(&self, count: usize) -> Vec<ServerLogEntry> {
        let skip = self.lines.len().saturating_sub(count);
        self.lines.iter().skip(skip).cloned().collect()
    }
}

/// Recent output of the supervised server, shared with the status layer.
#[derive(Debug, Default)]
pub struct ServerLogManager {
    buffer: RwLock<LogBuffer>,
}

impl ServerLogManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a log line (sync - can be called from any task)
    pub fn add_log(&self, stream: &'static str, line: &str) {
        let entry = ServerLogEntry::new(stream, line.to_string());
        self.buffer
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// The most recent `count` lines, oldest first.
    pub fn recent(&self, count: usize) -> Vec<ServerLogEntry> {
        self.buffer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last(count)
    }

    /// Drop buffered lines (call when a new server starts)
    pub fn clear(&self) {
        self.buffer
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .lines
            .clear();
    }
}

/// Sender side of a dated log file.
pub type LogFileSender = mpsc::UnboundedSender<String>;

/// Spawn the append-only writer for `path`.
///
/// The writer exits, flushing the file, once every sender has been dropped,
/// which happens when both output streams of the process reach EOF. Open and
/// write failures are logged and never reach the supervised process.
pub fn spawn_log_file_writer(path: PathBuf) -> LogFileSender {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        if let Some(dir) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(dir).await
        {
            warn!(path = %dir.display(), error = %e, "Failed to create log directory");
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open server log file");
                return;
            }
        };

        let mut write_failed = false;
        while let Some(line) = rx.recv().await {
            if let Err(e) = file.write_all(line.as_bytes()).await
                && !write_failed
            {
                // Report once; a full disk would otherwise flood the log
                warn!(path = %path.display(), error = %e, "Failed to write server log");
                write_failed = true;
            }
        }

        if let Err(e) = file.flush().await {
            warn!(path = %path.display(), error = %e, "Failed to flush server log");
        }
        debug!(path = %path.display(), "Server log writer exiting");
    });

    tx
}

/// Format a captured line for the log file.
pub fn format_log_line(stream: &str, line: &str) -> String {
    format!(
        "[{}] [{}] {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        stream,
        line
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_keeps_most_recent() {
        let manager = ServerLogManager::new();
        for i in 0..(MAX_LOG_LINES + 10) {
            manager.add_log("stdout", &format!("line {i}"));
        }

        let all = manager.recent(usize::MAX);
        assert_eq!(all.len(), MAX_LOG_LINES);
        assert_eq!(all[0].line, "line 10");

        let last_two = manager.recent(2);
        assert_eq!(last_two[1].line, format!("line {}", MAX_LOG_LINES + 9));
    }

    #[test]
    fn clear_empties_buffer() {
        let manager = ServerLogManager::new();
        manager.add_log("stderr", "boom");
        manager.clear();
        assert!(manager.recent(10).is_empty());
    }

    #[test]
    fn formatted_line_names_stream() {
        let line = format_log_line("stderr", "WARN something");
        assert!(line.contains("[stderr] WARN something"));
        assert!(line.ends_with('\n'));
    }

    #[tokio::test]
    async fn writer_appends_and_closes_when_senders_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("server-2026-01-01.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "existing\n").unwrap();

        let tx = spawn_log_file_writer(path.clone());
        tx.send(format_log_line("stdout", "hello")).unwrap();
        drop(tx);

        // Writer flushes asynchronously once the channel closes
        let mut content = String::new();
        for _ in 0..50 {
            content = std::fs::read_to_string(&path).unwrap();
            if content.contains("hello") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(content.starts_with("existing\n"));
        assert!(content.contains("[stdout] hello"));
    }
}
