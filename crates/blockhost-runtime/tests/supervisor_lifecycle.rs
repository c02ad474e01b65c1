//! Lifecycle tests for `ServerSupervisor` against shell scripts standing in
//! for the Java runtime.
//!
//! All scripts are written once, before any test spawns a process, so no
//! script is executed while a forked child still holds a write handle to it.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use blockhost_core::{DataPaths, ServerConfig, ServerEvent};
use blockhost_runtime::{ServerSupervisor, SupervisorError, SupervisorOptions};
use tokio::sync::broadcast;
use tokio::time::{Instant, timeout};

const COOPERATIVE: &str = r#"#!/bin/sh
echo "[12:00:00] [Server thread/INFO]: Starting minecraft server version 1.21.1"
echo "[12:00:01] [Server thread/INFO]: Done (1.234s)! For help, type \"help\""
while IFS= read -r line; do
  case "$line" in
    stop) echo "[12:00:09] [Server thread/INFO]: Stopping server"; exit 0 ;;
    join) echo "[12:00:02] [Server thread/INFO]: Steve joined the game" ;;
    leave) echo "[12:00:03] [Server thread/INFO]: Steve left the game" ;;
    *) echo "[12:00:04] [Server thread/INFO]: Unknown command: $line" ;;
  esac
done
"#;

const STUBBORN: &str = r#"#!/bin/sh
trap '' TERM
echo "[12:00:01] [Server thread/INFO]: Done (0.500s)! For help, type \"help\""
while IFS= read -r line; do :; done
"#;

const DEAF: &str = r#"#!/bin/sh
trap '' TERM
echo "[12:00:01] [Server thread/INFO]: Done (0.300s)! For help, type \"help\""
exec sleep 600
"#;

const CRASHING: &str = r#"#!/bin/sh
echo "[12:00:00] [Server thread/ERROR]: Failed to bind to port" >&2
exit 3
"#;

struct Scripts {
    _dir: tempfile::TempDir,
    cooperative: PathBuf,
    stubborn: PathBuf,
    deaf: PathBuf,
    crashing: PathBuf,
}

fn scripts() -> &'static Scripts {
    static SCRIPTS: OnceLock<Scripts> = OnceLock::new();
    SCRIPTS.get_or_init(|| {
        let dir = tempfile::tempdir().expect("script dir");
        let write = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, body).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
            path
        };
        Scripts {
            cooperative: write("java-cooperative", COOPERATIVE),
            stubborn: write("java-stubborn", STUBBORN),
            deaf: write("java-deaf", DEAF),
            crashing: write("java-crashing", CRASHING),
            _dir: dir,
        }
    })
}

struct Fixture {
    root: tempfile::TempDir,
    supervisor: ServerSupervisor,
}

impl Fixture {
    fn new() -> Self {
        Self::with_options(
            SupervisorOptions::default()
                .with_stop_timeout(Duration::from_secs(5))
                .with_orphan_grace(Duration::from_secs(2))
                .with_restart_delay(Duration::from_millis(100)),
        )
    }

    fn with_options(options: SupervisorOptions) -> Self {
        // Scripts must exist before the first spawn in this binary
        let _ = scripts();
        let root = tempfile::tempdir().expect("data root");
        let paths = DataPaths::new(root.path());
        std::fs::create_dir_all(paths.server_dir()).unwrap();
        std::fs::write(paths.server_dir().join("server.jar"), b"").unwrap();
        Self {
            supervisor: ServerSupervisor::new(paths, options),
            root,
        }
    }

    fn config(&self, java: &Path) -> ServerConfig {
        ServerConfig {
            java_path: java.to_path_buf(),
            server_dir: self.root.path().join("server"),
            jar_name: "server.jar".to_string(),
            min_memory_mb: 256,
            max_memory_mb: 512,
            port: 25565,
        }
    }

    fn pid_file(&self) -> PathBuf {
        self.root.path().join("server.pid")
    }

    fn recorded_pid(&self) -> Option<u32> {
        std::fs::read_to_string(self.pid_file())
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

async fn wait_for(
    events: &mut broadcast::Receiver<ServerEvent>,
    mut matches: impl FnMut(&ServerEvent) -> bool,
) -> ServerEvent {
    timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test]
async fn pid_file_tracks_start_stop_start() {
    let fx = Fixture::new();
    let config = fx.config(&scripts().cooperative);

    let handle = fx.supervisor.start(&config).await.unwrap();
    assert_eq!(fx.recorded_pid(), Some(handle.pid));
    assert_eq!(fx.supervisor.pid(), Some(handle.pid));
    assert!(fx.supervisor.is_running());

    fx.supervisor.stop().await;
    assert!(!fx.pid_file().exists());
    assert!(!fx.supervisor.is_running());
    assert!(!handle.is_alive());

    let second = fx.supervisor.start(&config).await.unwrap();
    assert_eq!(fx.recorded_pid(), Some(second.pid));

    fx.supervisor.stop().await;
    assert!(!fx.pid_file().exists());
}

#[tokio::test]
async fn output_drives_ready_and_player_events() {
    let fx = Fixture::new();
    let mut events = fx.supervisor.subscribe();

    let handle = fx.supervisor.start(&fx.config(&scripts().cooperative)).await.unwrap();
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, ServerEvent::Started { .. })).await,
        ServerEvent::Started { pid: handle.pid }
    );
    wait_for(&mut events, |e| *e == ServerEvent::Ready).await;

    assert!(fx.supervisor.send_command("join").await);
    wait_for(&mut events, |e| matches!(e, ServerEvent::PlayerJoined { .. })).await;
    assert_eq!(fx.supervisor.online_players(), vec!["Steve".to_string()]);

    assert!(fx.supervisor.send_command("leave").await);
    wait_for(&mut events, |e| matches!(e, ServerEvent::PlayerLeft { .. })).await;
    assert!(fx.supervisor.online_players().is_empty());

    let logs = fx.supervisor.recent_logs(100);
    assert!(logs.iter().any(|l| l.stream == "stdout" && l.line.contains("Done (")));

    fx.supervisor.stop().await;
    wait_for(&mut events, |e| matches!(e, ServerEvent::Exited { .. })).await;
    assert!(!fx.supervisor.send_command("join").await);
}

#[tokio::test]
async fn output_is_written_to_dated_log_file() {
    let fx = Fixture::new();
    let mut events = fx.supervisor.subscribe();

    fx.supervisor.start(&fx.config(&scripts().cooperative)).await.unwrap();
    wait_for(&mut events, |e| *e == ServerEvent::Ready).await;
    fx.supervisor.stop().await;

    let logs_dir = fx.root.path().join("logs");
    let mut content = String::new();
    for _ in 0..50 {
        if let Some(entry) = std::fs::read_dir(&logs_dir).ok().and_then(|mut d| d.next()) {
            let entry = entry.unwrap();
            assert!(entry.file_name().to_string_lossy().starts_with("server-"));
            content = std::fs::read_to_string(entry.path()).unwrap();
            if content.contains("Stopping server") {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(content.contains("[stdout]"));
    assert!(content.contains("Done (1.234s)!"));
}

#[tokio::test]
async fn missing_jar_spawns_nothing() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.root.path().join("server").join("server.jar")).unwrap();

    let err = fx
        .supervisor
        .start(&fx.config(&scripts().cooperative))
        .await
        .unwrap_err();

    assert!(matches!(err, SupervisorError::MissingBinary { .. }));
    assert!(err.to_string().contains("server.jar"));
    assert!(!fx.supervisor.is_running());
    assert!(!fx.pid_file().exists());
}

#[tokio::test]
async fn second_start_is_rejected() {
    let fx = Fixture::new();
    let config = fx.config(&scripts().cooperative);

    let handle = fx.supervisor.start(&config).await.unwrap();
    let err = fx.supervisor.start(&config).await.unwrap_err();
    assert!(matches!(err, SupervisorError::AlreadyRunning { pid } if pid == handle.pid));

    fx.supervisor.stop().await;
}

#[tokio::test]
async fn stop_without_server_removes_stale_pid_file() {
    let fx = Fixture::new();
    std::fs::write(fx.pid_file(), "999999999").unwrap();

    fx.supervisor.stop().await;

    assert!(!fx.pid_file().exists());
}

#[tokio::test]
async fn stubborn_server_is_killed_after_timeout() {
    let fx = Fixture::with_options(
        SupervisorOptions::default().with_stop_timeout(Duration::from_millis(500)),
    );
    let mut events = fx.supervisor.subscribe();

    fx.supervisor.start(&fx.config(&scripts().stubborn)).await.unwrap();
    wait_for(&mut events, |e| *e == ServerEvent::Ready).await;

    let started = Instant::now();
    fx.supervisor.stop().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!fx.supervisor.is_running());
    assert!(!fx.pid_file().exists());
    // Killed by signal, so no exit code
    assert_eq!(
        wait_for(&mut events, |e| matches!(e, ServerEvent::Exited { .. })).await,
        ServerEvent::Exited { code: None }
    );
}

#[tokio::test]
async fn stop_is_bounded_when_console_is_not_read() {
    let fx = Fixture::with_options(
        SupervisorOptions::default().with_stop_timeout(Duration::from_millis(500)),
    );
    let mut events = fx.supervisor.subscribe();

    fx.supervisor.start(&fx.config(&scripts().deaf)).await.unwrap();
    wait_for(&mut events, |e| *e == ServerEvent::Ready).await;

    // Larger than a pipe buffer: the write blocks holding the console
    let flood = "x".repeat(200_000);
    let started = Instant::now();
    let (sent, ()) = timeout(
        Duration::from_secs(10),
        async { tokio::join!(fx.supervisor.send_command(&flood), fx.supervisor.stop()) },
    )
    .await
    .expect("stop did not finish");

    assert!(!sent);
    assert!(started.elapsed() < Duration::from_secs(8));
    assert!(!fx.supervisor.is_running());
    assert!(!fx.supervisor.is_stopping());
    assert!(!fx.pid_file().exists());
}

#[tokio::test]
async fn concurrent_stops_run_one_sequence() {
    let fx = Fixture::with_options(
        SupervisorOptions::default().with_stop_timeout(Duration::from_millis(500)),
    );
    let mut events = fx.supervisor.subscribe();

    fx.supervisor.start(&fx.config(&scripts().stubborn)).await.unwrap();
    wait_for(&mut events, |e| *e == ServerEvent::Ready).await;

    tokio::join!(fx.supervisor.stop(), fx.supervisor.stop());
    fx.supervisor.wait_for_exit().await;

    let mut stopping = 0;
    let mut exited = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            ServerEvent::Stopping => stopping += 1,
            ServerEvent::Exited { .. } => exited += 1,
            _ => {}
        }
    }
    assert_eq!(stopping, 1);
    assert_eq!(exited, 1);
    assert!(!fx.pid_file().exists());
}

#[tokio::test]
async fn crash_cleans_up_on_its_own() {
    let fx = Fixture::new();
    let mut events = fx.supervisor.subscribe();

    fx.supervisor.start(&fx.config(&scripts().crashing)).await.unwrap();

    assert_eq!(
        wait_for(&mut events, |e| matches!(e, ServerEvent::Exited { .. })).await,
        ServerEvent::Exited { code: Some(3) }
    );
    assert!(!fx.supervisor.is_running());
    assert!(!fx.pid_file().exists());
    assert_eq!(fx.supervisor.uptime_secs(), 0);

    // The reader may drain the pipe after the exit is observed
    let mut captured = false;
    for _ in 0..50 {
        captured = fx
            .supervisor
            .recent_logs(10)
            .iter()
            .any(|l| l.stream == "stderr" && l.line.contains("Failed to bind"));
        if captured {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(captured);
}

#[tokio::test]
async fn stale_pid_file_is_replaced_on_start() {
    let fx = Fixture::new();
    std::fs::write(fx.pid_file(), "999999999").unwrap();

    let handle = fx.supervisor.start(&fx.config(&scripts().cooperative)).await.unwrap();

    assert_eq!(fx.recorded_pid(), Some(handle.pid));
    fx.supervisor.stop().await;
}

#[tokio::test]
async fn live_orphan_is_terminated_before_start() {
    let fx = Fixture::new();
    let mut orphan = tokio::process::Command::new("sleep")
        .arg("60")
        .spawn()
        .expect("spawn orphan");
    let orphan_pid = orphan.id().expect("orphan pid");
    let reaper = tokio::spawn(async move { orphan.wait().await });
    std::fs::write(fx.pid_file(), orphan_pid.to_string()).unwrap();

    let handle = fx.supervisor.start(&fx.config(&scripts().cooperative)).await.unwrap();

    let status = timeout(Duration::from_secs(5), reaper)
        .await
        .expect("orphan still running")
        .unwrap()
        .unwrap();
    assert!(!status.success());
    assert_ne!(handle.pid, orphan_pid);
    assert_eq!(fx.recorded_pid(), Some(handle.pid));

    fx.supervisor.stop().await;
}

#[tokio::test]
async fn restart_launches_a_fresh_process() {
    let fx = Fixture::new();
    let config = fx.config(&scripts().cooperative);

    let first = fx.supervisor.start(&config).await.unwrap();
    let second = fx.supervisor.restart(&config).await.unwrap();

    assert_ne!(first.pid, second.pid);
    assert!(!first.is_alive());
    assert!(second.is_alive());
    assert_eq!(fx.recorded_pid(), Some(second.pid));

    fx.supervisor.stop().await;
}

#[tokio::test]
async fn restart_waits_for_stop_already_in_flight() {
    let fx = Fixture::with_options(
        SupervisorOptions::default()
            .with_stop_timeout(Duration::from_millis(500))
            .with_restart_delay(Duration::from_millis(50)),
    );
    let mut events = fx.supervisor.subscribe();

    let first = fx.supervisor.start(&fx.config(&scripts().stubborn)).await.unwrap();
    wait_for(&mut events, |e| *e == ServerEvent::Ready).await;

    let cooperative = fx.config(&scripts().cooperative);
    let (_, restarted) = tokio::join!(fx.supervisor.stop(), async {
        // Let the first stop take the flag
        tokio::task::yield_now().await;
        fx.supervisor.restart(&cooperative).await
    });

    let second = restarted.unwrap();
    assert_ne!(first.pid, second.pid);
    assert_eq!(fx.supervisor.pid(), Some(second.pid));
    assert_eq!(fx.recorded_pid(), Some(second.pid));

    fx.supervisor.stop().await;
    assert!(!fx.pid_file().exists());
}

#[tokio::test]
async fn uptime_counts_from_launch() {
    let fx = Fixture::new();
    assert_eq!(fx.supervisor.uptime_secs(), 0);

    fx.supervisor.start(&fx.config(&scripts().cooperative)).await.unwrap();
    assert!(fx.supervisor.started_at().is_some());
    assert!(fx.supervisor.uptime_secs() < 5);

    fx.supervisor.stop().await;
    assert_eq!(fx.supervisor.uptime_secs(), 0);
    assert!(fx.supervisor.started_at().is_none());
}
