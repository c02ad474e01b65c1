//! Shared types for process supervision.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Timing constants for the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// How long `stop` waits for the server to save and exit after the
    /// `stop` console command before killing it.
    pub stop_timeout: Duration,
    /// Grace window between the graceful and forceful kill of an orphan.
    pub orphan_grace: Duration,
    /// Pause between stop and start in `restart`, letting the OS release the port.
    pub restart_delay: Duration,
    /// Bound on waiting for exit cleanup after a forced kill.
    pub forced_kill_wait: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(30),
            orphan_grace: Duration::from_secs(5),
            restart_delay: Duration::from_secs(2),
            forced_kill_wait: Duration::from_secs(10),
        }
    }
}

impl SupervisorOptions {
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }

    #[must_use]
    pub const fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_forced_kill_wait(mut self, wait: Duration) -> Self {
        self.forced_kill_wait = wait;
        self
    }
}

/// Players currently online, maintained from join/leave lines.
#[derive(Debug, Default)]
pub struct PlayerRoster {
    names: Mutex<BTreeSet<String>>,
}

impl PlayerRoster {
    pub fn joined(&self, name: &str) {
        self.lock().insert(name.to_string());
    }

    pub fn left(&self, name: &str) {
        self.lock().remove(name);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Sorted snapshot of online players.
    pub fn online(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_tracks_join_and_leave() {
        let roster = PlayerRoster::default();
        roster.joined("Steve");
        roster.joined("Alex");
        roster.left("Steve");
        roster.left("Nobody");
        assert_eq!(roster.online(), vec!["Alex".to_string()]);

        roster.clear();
        assert!(roster.online().is_empty());
    }

    #[test]
    fn default_stop_timeout_is_thirty_seconds() {
        assert_eq!(SupervisorOptions::default().stop_timeout, Duration::from_secs(30));
    }
}
