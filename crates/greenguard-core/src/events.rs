//! Channel event system.
//!
//! The real-time channel publishes every state change as a [`ChannelEvent`]
//! on a broadcast channel. Each applied message produces its own event;
//! nothing is coalesced, so a slow subscriber may observe
//! [`broadcast::error::RecvError::Lagged`].

use core::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use greenguard_types::{Alert, EnvironmentalSnapshot};

use crate::config::DEFAULT_EVENT_CAPACITY;

/// Connection state of the real-time channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Not connected and not trying.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The stream is open.
    Connected,
    /// The transport failed; a close follows.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Error => write!(f, "error"),
        }
    }
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Pushed by the backend stream.
    Live,
    /// Entered by the user in manual-override mode.
    Manual,
}

/// Events emitted by the real-time channel.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ChannelEvent {
    /// Connection status changed.
    StatusChanged { status: ConnectionStatus },
    /// A snapshot was applied, with the alerts that currently hold for it.
    Update {
        source: SnapshotSource,
        snapshot: EnvironmentalSnapshot,
        alerts: Vec<Alert>,
    },
    /// The tier changed into a tier above Good.
    Alert { alert: Alert },
    /// Manual override was switched on or off.
    ManualOverrideChanged { enabled: bool },
    /// The stream closed and a retry is waiting.
    ReconnectScheduled { attempt: u32, delay: Duration },
}

/// Sender for channel events.
pub type EventSender = broadcast::Sender<ChannelEvent>;

/// Receiver for channel events.
pub type EventReceiver = broadcast::Receiver<ChannelEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: ChannelEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_to_all_receivers() {
        let dispatcher = EventDispatcher::default();
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 2);

        dispatcher.send(ChannelEvent::ManualOverrideChanged { enabled: true });
        assert_eq!(
            a.recv().await.unwrap(),
            ChannelEvent::ManualOverrideChanged { enabled: true }
        );
        assert_eq!(
            b.recv().await.unwrap(),
            ChannelEvent::ManualOverrideChanged { enabled: true }
        );
    }

    #[test]
    fn test_send_without_receivers_is_silent() {
        let dispatcher = EventDispatcher::new(0);
        dispatcher.send(ChannelEvent::StatusChanged {
            status: ConnectionStatus::Connected,
        });
    }

    #[test]
    fn test_event_serialization() {
        let event = ChannelEvent::StatusChanged {
            status: ConnectionStatus::Error,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["status"], "error");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ConnectionStatus::default().to_string(), "disconnected");
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
    }
}
