//! Server event broadcasting.
//!
//! Subscribers (CLI, status layer) receive every lifecycle event the
//! supervisor emits. Sending never blocks and never fails the supervisor:
//! with no subscribers, events are simply dropped.

use blockhost_core::ServerEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast channel capacity for server events
const CHANNEL_CAPACITY: usize = 64;

/// Broadcaster for server lifecycle events
#[derive(Debug, Clone)]
pub struct ServerEventBroadcaster {
    sender: broadcast::Sender<ServerEvent>,
}

impl ServerEventBroadcaster {
    /// Create a new broadcaster
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Broadcast a server event to all subscribers
    pub fn broadcast(&self, event: ServerEvent) {
        debug!(?event, "Broadcasting server event");
        // Only fails when nobody is listening
        let _ = self.sender.send(event);
    }

    /// Subscribe to server events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ServerEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let broadcaster = ServerEventBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.broadcast(ServerEvent::Started { pid: 10 });
        broadcaster.broadcast(ServerEvent::Ready);

        assert_eq!(rx.recv().await.unwrap(), ServerEvent::Started { pid: 10 });
        assert_eq!(rx.recv().await.unwrap(), ServerEvent::Ready);
    }

    #[test]
    fn broadcasting_without_subscribers_is_harmless() {
        ServerEventBroadcaster::new().broadcast(ServerEvent::Stopping);
    }
}
