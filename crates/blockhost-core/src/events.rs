//! Server lifecycle events.
//!
//! Emitted by the supervisor and consumed by whoever drives it (CLI, status
//! layer). Events are a notification stream; the supervisor's own state stays
//! the source of truth for `is_running` and uptime.

use serde::{Deserialize, Serialize};

/// Server lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Process spawned and its PID recorded.
    Started { pid: u32 },

    /// The server printed its ready marker. Emitted once per process.
    Ready,

    /// A player joined the game.
    PlayerJoined { name: String },

    /// A player left the game.
    PlayerLeft { name: String },

    /// A stop sequence has begun.
    Stopping,

    /// Process exited and its handle and PID file were cleared.
    /// `code` is `None` when the process was terminated by a signal.
    Exited { code: Option<i32> },
}

impl ServerEvent {
    pub fn player_joined(name: impl Into<String>) -> Self {
        Self::PlayerJoined { name: name.into() }
    }

    pub fn player_left(name: impl Into<String>) -> Self {
        Self::PlayerLeft { name: name.into() }
    }
}
