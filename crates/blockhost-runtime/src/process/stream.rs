//! Async stream readers for server output (non-UTF8-safe).
//!
//! The JVM and plugins can emit non-UTF8 bytes on stdout/stderr. Using
//! `BufReader::lines()` would terminate the reader task on invalid UTF-8, so
//! lines are read as bytes and decoded lossily.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use blockhost_core::ServerEvent;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::broadcaster::ServerEventBroadcaster;
use super::logs::{LogFileSender, ServerLogManager, format_log_line};
use super::parse::parse_log_line;
use super::types::PlayerRoster;

/// Everything a reader needs to fan a line out.
#[derive(Clone)]
pub struct StreamContext {
    pub pid: u32,
    /// Launch this process belongs to.
    pub generation: u64,
    /// Launch the supervisor currently tracks.
    pub current_generation: Arc<AtomicU64>,
    pub log_file: LogFileSender,
    pub logs: Arc<ServerLogManager>,
    pub events: ServerEventBroadcaster,
    pub players: Arc<PlayerRoster>,
    /// Shared by both readers of one process so `Ready` fires once.
    pub ready: Arc<AtomicBool>,
}

impl StreamContext {
    fn handle_line(&self, stream_type: &'static str, line: &str) {
        debug!(pid = %self.pid, %stream_type, "{}: {}", stream_type, line);
        // Closed only if the writer failed to open the file; already reported
        let _ = self.log_file.send(format_log_line(stream_type, line));

        // Late output of a replaced process stays out of the new one's buffer and roster
        if self.current_generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        self.logs.add_log(stream_type, line);

        match parse_log_line(line) {
            Some(ServerEvent::Ready) => {
                if !self.ready.swap(true, Ordering::SeqCst) {
                    info!(pid = %self.pid, "Server is ready");
                    self.events.broadcast(ServerEvent::Ready);
                }
            }
            Some(ServerEvent::PlayerJoined { name }) => {
                info!(player = %name, "Player joined");
                self.players.joined(&name);
                self.events.broadcast(ServerEvent::PlayerJoined { name });
            }
            Some(ServerEvent::PlayerLeft { name }) => {
                info!(player = %name, "Player left");
                self.players.left(&name);
                self.events.broadcast(ServerEvent::PlayerLeft { name });
            }
            _ => {}
        }
    }
}

pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_type: &'static str,
    ctx: StreamContext,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    // Trim trailing newline(s)
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    let line = String::from_utf8_lossy(&buf);
                    ctx.handle_line(stream_type, &line);
                }
                Err(e) => {
                    debug!(pid = %ctx.pid, %stream_type, error = %e, "log stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(pid = %ctx.pid, %stream_type, "log stream reader task exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn context() -> (StreamContext, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = StreamContext {
            pid: 1,
            generation: 1,
            current_generation: Arc::new(AtomicU64::new(1)),
            log_file: tx,
            logs: Arc::new(ServerLogManager::new()),
            events: ServerEventBroadcaster::new(),
            players: Arc::new(PlayerRoster::default()),
            ready: Arc::new(AtomicBool::new(false)),
        };
        (ctx, rx)
    }

    #[tokio::test]
    async fn reader_fans_out_lines_and_events() {
        let (ctx, mut file_rx) = context();
        let mut events = ctx.events.subscribe();

        let input: &[u8] = b"[00:00:01] [Server thread/INFO]: Done (1.0s)! For help, type \"help\"\r\n\
            [00:00:02] [Server thread/INFO]: Steve joined the game\n\
            bad \xff byte\n";
        spawn_stream_reader(input, "stdout", ctx.clone()).await.unwrap();

        assert_eq!(events.recv().await.unwrap(), ServerEvent::Ready);
        assert_eq!(events.recv().await.unwrap(), ServerEvent::player_joined("Steve"));
        assert_eq!(ctx.players.online(), vec!["Steve".to_string()]);

        let lines = ctx.logs.recent(10);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].line.ends_with("type \"help\""));
        assert_eq!(lines[2].line, "bad \u{fffd} byte");

        assert!(file_rx.recv().await.unwrap().contains("[stdout]"));
    }

    #[tokio::test]
    async fn output_of_a_replaced_process_only_reaches_its_log_file() {
        let (ctx, mut file_rx) = context();
        let mut events = ctx.events.subscribe();
        ctx.current_generation.store(2, Ordering::SeqCst);

        let input: &[u8] = b"[00:00:02] [Server thread/INFO]: Alex joined the game\n";
        spawn_stream_reader(input, "stdout", ctx.clone()).await.unwrap();

        assert!(file_rx.recv().await.unwrap().contains("Alex joined the game"));
        assert!(ctx.logs.recent(10).is_empty());
        assert!(ctx.players.online().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn ready_fires_once_across_streams() {
        let (ctx, _file_rx) = context();
        let mut events = ctx.events.subscribe();
        let ready: &[u8] = b"Done (2.0s)! For help, type \"help\"\n";

        spawn_stream_reader(ready, "stdout", ctx.clone()).await.unwrap();
        spawn_stream_reader(ready, "stderr", ctx.clone()).await.unwrap();
        ctx.events.broadcast(ServerEvent::Stopping);

        assert_eq!(events.recv().await.unwrap(), ServerEvent::Ready);
        assert_eq!(events.recv().await.unwrap(), ServerEvent::Stopping);
    }
}
