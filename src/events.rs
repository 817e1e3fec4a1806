//! Client event broadcasting
//!
//! Frontends (the REPL, a future GUI) observe the client through a broadcast
//! channel rather than polling. Events are snapshots; a subscriber that
//! misses one can rebuild from the next `ConversationChanged`.

use tokio::sync::broadcast;

use crate::conversation::Turn;

/// Buffered events per subscriber before old ones are dropped
const EVENT_CAPACITY: usize = 64;

/// Something a frontend may want to react to
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A provisional transcript for the live recording session
    PartialTranscript(String),
    /// The finalized transcript for a completed recording session
    FinalTranscript(String),
    /// The conversation log changed; carries the full turn list
    ConversationChanged(Vec<Turn>),
    /// The microphone was armed or disarmed
    RecordingStateChanged(bool),
}

/// Fan-out channel for [`ClientEvent`]s
///
/// Cheap to clone; all clones publish into the same stream.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Create a bus with no subscribers yet
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Subscribe to events published after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers
    ///
    /// Publishing with no subscribers is a no-op.
    pub fn emit(&self, event: ClientEvent) {
        let receivers = self.sender.receiver_count();
        if receivers == 0 {
            return;
        }
        if self.sender.send(event).is_err() {
            tracing::debug!("event dropped, subscribers went away");
        }
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
