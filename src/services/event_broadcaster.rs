//! Event broadcaster for session-scoped deployment updates.
//!
//! Uses tokio::sync::broadcast to fan-out events; subscribers narrow the stream to one session.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::models::DeploymentEvent;

/// Default capacity for the broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Event broadcaster that distributes deployment events to subscribers.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DeploymentEvent>,
}

impl EventBroadcaster {
    /// Create a new EventBroadcaster with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new EventBroadcaster with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events for every session.
    pub fn subscribe(&self) -> broadcast::Receiver<DeploymentEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to events for one session only.
    pub fn subscribe_session(&self, session_id: &str) -> SessionSubscription {
        SessionSubscription {
            session_id: session_id.to_string(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Broadcast an event to all subscribers.
    /// Returns the number of receivers that received the event.
    /// If there are no subscribers, returns 0 (does not error).
    pub fn send(&self, event: DeploymentEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver filtered to a single session.
pub struct SessionSubscription {
    session_id: String,
    receiver: broadcast::Receiver<DeploymentEvent>,
}

impl SessionSubscription {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Wait for the next event of this session.
    ///
    /// Returns `None` once the broadcaster is gone. Lagged events are skipped.
    pub async fn recv(&mut self) -> Option<DeploymentEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.session_id() == self.session_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        skipped,
                        "Deployment event subscriber lagged"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
