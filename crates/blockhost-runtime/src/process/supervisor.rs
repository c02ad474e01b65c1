//! Supervision of the single game server process.
//!
//! The supervisor owns at most one child process. All bookkeeping for it
//! (in-memory handle, PID file, log stream, roster) is torn down by a single
//! exit monitor task, so cleanup runs exactly once no matter whether the
//! process stopped on request, was killed after a timeout, or crashed.
//!
//! `start` and `stop` serialise on a lifecycle lock. A `stop` racing another
//! `stop` is a no-op: the first caller flips the stopping flag synchronously
//! and the second observes it before awaiting anything.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use blockhost_core::{DataPaths, ServerConfig, ServerEvent};
use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Notify, broadcast, watch};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::broadcaster::ServerEventBroadcaster;
use super::error::SupervisorError;
use super::logs::{ServerLogEntry, ServerLogManager, spawn_log_file_writer};
use super::shutdown::force_kill_pid;
use super::stream::{StreamContext, spawn_stream_reader};
use super::types::{PlayerRoster, SupervisorOptions};
use crate::pidfile::{PidFile, recover_orphan};

/// Console command that makes the server save the world and exit.
const STOP_COMMAND: &str = "stop";

/// Bound on delivering one console line, including waiting for the pipe.
const COMMAND_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

type SharedStdin = Arc<tokio::sync::Mutex<Option<ChildStdin>>>;
type SharedState = Arc<Mutex<Option<ActiveServer>>>;

/// In-memory handle of the running process.
struct ActiveServer {
    pid: u32,
    started_at: Instant,
    started_wall: DateTime<Local>,
    stdin: SharedStdin,
    kill: Arc<Notify>,
    exited: watch::Receiver<bool>,
}

/// Caller-facing view of a launched server.
///
/// The supervisor keeps the real handle; this one only answers liveness
/// questions, so holders of a stale copy must check [`is_alive`](Self::is_alive).
#[derive(Debug, Clone)]
pub struct ServerProcessHandle {
    pub pid: u32,
    pub started_at: DateTime<Local>,
    exited: watch::Receiver<bool>,
}

impl ServerProcessHandle {
    /// `false` once the process exited and its cleanup ran.
    pub fn is_alive(&self) -> bool {
        !*self.exited.borrow()
    }

    /// Wait until the process exited and its cleanup ran.
    pub async fn wait(&mut self) {
        let _ = self.exited.wait_for(|done| *done).await;
    }
}

/// Clears the stopping flag when a stop sequence ends, on every path.
struct StoppingGuard<'a> {
    stopping: &'a AtomicBool,
}

impl Drop for StoppingGuard<'_> {
    fn drop(&mut self) {
        self.stopping.store(false, Ordering::SeqCst);
    }
}

/// Owns the lifecycle of the game server process.
pub struct ServerSupervisor {
    paths: DataPaths,
    pid_file: PidFile,
    options: SupervisorOptions,
    state: SharedState,
    lifecycle: tokio::sync::Mutex<()>,
    stopping: AtomicBool,
    events: ServerEventBroadcaster,
    logs: Arc<ServerLogManager>,
    players: Arc<PlayerRoster>,
    /// Launch counter; output from an earlier launch is not attributed to the current one.
    generation: Arc<AtomicU64>,
}

impl ServerSupervisor {
    pub fn new(paths: DataPaths, options: SupervisorOptions) -> Self {
        let pid_file = PidFile::new(paths.pid_file());
        Self {
            paths,
            pid_file,
            options,
            state: Arc::new(Mutex::new(None)),
            lifecycle: tokio::sync::Mutex::new(()),
            stopping: AtomicBool::new(false),
            events: ServerEventBroadcaster::new(),
            logs: Arc::new(ServerLogManager::new()),
            players: Arc::new(PlayerRoster::default()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Launch the server.
    ///
    /// Kills any orphan recorded in the PID file first, then spawns
    /// `<java> -Xms.. -Xmx.. -jar <jar> nogui` in the server directory with
    /// piped stdio and records the new PID.
    pub async fn start(&self, config: &ServerConfig) -> Result<ServerProcessHandle, SupervisorError> {
        let _lifecycle = self.lifecycle.lock().await;

        if let Some(pid) = self.pid() {
            return Err(SupervisorError::AlreadyRunning { pid });
        }

        let jar = config.jar_path();
        if !jar.is_file() {
            return Err(SupervisorError::MissingBinary { path: jar });
        }

        let outcome = recover_orphan(&self.pid_file, self.options.orphan_grace).await;
        debug!(?outcome, "Orphan check complete");

        let mut child = self.spawn_process(config)?;
        let Some(pid) = child.id() else {
            let _ = child.start_kill();
            return Err(SupervisorError::MissingPid);
        };

        if let Err(e) = self.pid_file.write(pid) {
            warn!(pid, error = %e, "Failed to write PID file");
        }

        let started_wall = Local::now();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.logs.clear();
        self.players.clear();
        self.spawn_readers(&mut child, pid, generation, started_wall);

        let stdin: SharedStdin = Arc::new(tokio::sync::Mutex::new(child.stdin.take()));
        let kill = Arc::new(Notify::new());
        let (exited_tx, exited_rx) = watch::channel(false);

        *self.lock_state() = Some(ActiveServer {
            pid,
            started_at: Instant::now(),
            started_wall,
            stdin,
            kill: kill.clone(),
            exited: exited_rx.clone(),
        });

        let cleanup = ExitCleanup {
            state: self.state.clone(),
            pid_file: self.pid_file.clone(),
            events: self.events.clone(),
            players: self.players.clone(),
        };
        tokio::spawn(monitor_exit(child, pid, kill, cleanup, exited_tx));

        info!(pid, port = config.port, "Server process started");
        self.events.broadcast(ServerEvent::Started { pid });

        Ok(ServerProcessHandle {
            pid,
            started_at: started_wall,
            exited: exited_rx,
        })
    }

    fn spawn_process(&self, config: &ServerConfig) -> Result<Child, SupervisorError> {
        let mut cmd = Command::new(&config.java_path);
        cmd.args(config.launch_args())
            .current_dir(&config.server_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(command = ?cmd, "Spawning server");
        cmd.spawn().map_err(SupervisorError::Spawn)
    }

    fn spawn_readers(&self, child: &mut Child, pid: u32, generation: u64, started: DateTime<Local>) {
        let log_path = self.paths.log_file_for(started.date_naive());
        let ctx = StreamContext {
            pid,
            generation,
            current_generation: self.generation.clone(),
            log_file: spawn_log_file_writer(log_path),
            logs: self.logs.clone(),
            events: self.events.clone(),
            players: self.players.clone(),
            ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        };

        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, "stdout", ctx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, "stderr", ctx);
        }
    }

    /// Stop the server, gracefully if possible.
    ///
    /// Sends the `stop` console command and waits up to the stop timeout for
    /// the process to exit, then kills it. Delivering the command counts
    /// against the same timeout, so a server that stopped reading its console
    /// is killed on schedule. Returns immediately if another
    /// stop is already in flight. With no supervised process, any stale PID
    /// file is removed.
    pub async fn stop(&self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            debug!("Stop already in progress, ignoring request");
            return;
        }
        let _stopping = StoppingGuard {
            stopping: &self.stopping,
        };
        let _lifecycle = self.lifecycle.lock().await;

        let Some((pid, stdin, kill, mut exited)) = self.with_active(|s| {
            (s.pid, s.stdin.clone(), s.kill.clone(), s.exited.clone())
        }) else {
            debug!("No server running, clearing stale PID file");
            self.remove_pid_file();
            return;
        };

        info!(pid, "Stopping server");
        self.events.broadcast(ServerEvent::Stopping);

        let graceful = timeout(self.options.stop_timeout, async {
            if !write_line(&stdin, STOP_COMMAND).await {
                warn!(pid, "Could not deliver stop command, waiting for exit anyway");
            }
            wait_exited(&mut exited).await;
        })
        .await;
        if graceful.is_ok() {
            info!(pid, "Server stopped gracefully");
            return;
        }

        warn!(
            pid,
            timeout_secs = self.options.stop_timeout.as_secs(),
            "Server did not stop in time, killing it"
        );
        kill.notify_one();

        if timeout(self.options.forced_kill_wait, wait_exited(&mut exited))
            .await
            .is_err()
        {
            // The monitor never observed the exit; clean up on its behalf
            error!(pid, "Server did not exit after kill, clearing its state");
            if let Err(e) = force_kill_pid(pid) {
                warn!(pid, error = %e, "Forced kill by PID failed");
            }
            self.remove_pid_file();
            self.clear_state_if(pid);
        }
    }

    /// Stop (if running), wait for the port to be released, then start.
    ///
    /// A stop already in flight from another caller is awaited rather than raced.
    pub async fn restart(&self, config: &ServerConfig) -> Result<ServerProcessHandle, SupervisorError> {
        if self.is_running() || self.is_stopping() {
            self.stop().await;
            self.wait_for_exit().await;
            sleep(self.options.restart_delay).await;
        }
        self.start(config).await
    }

    /// Write a console line to the server.
    ///
    /// Returns `false` (with no side effect) when no server is supervised, or
    /// when the write fails or does not complete within a few seconds.
    pub async fn send_command(&self, text: &str) -> bool {
        let Some(stdin) = self.with_active(|s| s.stdin.clone()) else {
            return false;
        };
        write_line(&stdin, text).await
    }

    /// Seconds since the current process was launched; 0 when none.
    pub fn uptime_secs(&self) -> u64 {
        self.with_active(|s| s.started_at.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().is_some()
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub fn pid(&self) -> Option<u32> {
        self.with_active(|s| s.pid)
    }

    /// Wall-clock launch time of the current process.
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.with_active(|s| s.started_wall)
    }

    /// Wait for the current process (if any) to exit and be cleaned up.
    pub async fn wait_for_exit(&self) {
        if let Some(mut exited) = self.with_active(|s| s.exited.clone()) {
            wait_exited(&mut exited).await;
        }
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// The most recent `count` captured output lines.
    pub fn recent_logs(&self, count: usize) -> Vec<ServerLogEntry> {
        self.logs.recent(count)
    }

    /// Players currently online, sorted.
    pub fn online_players(&self) -> Vec<String> {
        self.players.online()
    }

    pub fn pid_file(&self) -> &PidFile {
        &self.pid_file
    }

    /// Kill the supervised process immediately and remove the PID file.
    ///
    /// Synchronous, for exit hooks. Tolerates the process and file already
    /// being gone. Returns the PID that was targeted.
    pub fn kill_now(&self) -> Option<u32> {
        let pid = self.pid();
        if let Some(pid) = pid {
            warn!(pid, "Force-killing server process");
            if let Err(e) = force_kill_pid(pid) {
                warn!(pid, error = %e, "Forced kill failed");
            }
        }
        self.remove_pid_file();
        pid
    }

    fn remove_pid_file(&self) {
        if let Err(e) = self.pid_file.remove() {
            warn!(path = %self.pid_file.path().display(), error = %e, "Failed to remove PID file");
        }
    }

    fn clear_state_if(&self, pid: u32) {
        let mut state = self.lock_state();
        if state.as_ref().is_some_and(|s| s.pid == pid) {
            *state = None;
        }
    }

    fn with_active<T>(&self, f: impl FnOnce(&ActiveServer) -> T) -> Option<T> {
        self.lock_state().as_ref().map(f)
    }

    fn lock_state(&self) -> MutexGuard<'_, Option<ActiveServer>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Teardown performed once per process by its exit monitor.
struct ExitCleanup {
    state: SharedState,
    pid_file: PidFile,
    events: ServerEventBroadcaster,
    players: Arc<PlayerRoster>,
}

impl ExitCleanup {
    fn run(&self, pid: u32, code: Option<i32>) {
        // PID file goes first: a new start is only admitted once the handle is cleared.
        // A forced stop may already have cleared this process and let a new one record its PID.
        match self.pid_file.remove_if_owned(pid) {
            Ok(true) => {}
            Ok(false) => debug!(pid, "PID file no longer records this process, leaving it"),
            Err(e) => warn!(pid, error = %e, "Failed to remove PID file"),
        }

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.as_ref().is_some_and(|s| s.pid == pid) {
                *state = None;
            }
        }

        self.players.clear();
        self.events.broadcast(ServerEvent::Exited { code });
    }
}

/// Own the child until it exits; kill it when asked.
async fn monitor_exit(
    mut child: Child,
    pid: u32,
    kill: Arc<Notify>,
    cleanup: ExitCleanup,
    exited: watch::Sender<bool>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        () = kill.notified() => {
            if let Err(e) = child.start_kill() {
                warn!(pid, error = %e, "Failed to kill server process");
            }
            child.wait().await
        }
    };

    let code = match status {
        Ok(status) => {
            info!(pid, %status, "Server process exited");
            status.code()
        }
        Err(e) => {
            warn!(pid, error = %e, "Failed to collect server exit status");
            None
        }
    };

    cleanup.run(pid, code);
    exited.send_replace(true);
}

async fn wait_exited(exited: &mut watch::Receiver<bool>) {
    // Err only if the monitor vanished, which also means nothing is left to wait for
    let _ = exited.wait_for(|done| *done).await;
}

async fn write_line(stdin: &SharedStdin, text: &str) -> bool {
    let line = format!("{}\n", text.trim_end_matches(['\r', '\n']));
    let result = timeout(COMMAND_WRITE_TIMEOUT, async {
        let mut guard = stdin.lock().await;
        let Some(pipe) = guard.as_mut() else {
            return Ok::<_, std::io::Error>(false);
        };
        pipe.write_all(line.as_bytes()).await?;
        pipe.flush().await?;
        Ok::<_, std::io::Error>(true)
    })
    .await;

    match result {
        Ok(Ok(written)) => written,
        Ok(Err(e)) => {
            debug!(error = %e, "Failed to write to server stdin");
            false
        }
        Err(_) => {
            warn!(
                timeout_secs = COMMAND_WRITE_TIMEOUT.as_secs(),
                "Server is not reading its console, command dropped"
            );
            false
        }
    }
}
