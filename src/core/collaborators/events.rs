use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::core::models::{Message, Streaming};

/// Session lifecycle events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    StreamingCreated(Streaming),
    MessagePlayStarted(Message),
    MessagePlayFinished(Message),
    StreamingFinished(Streaming),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StreamingCreated(_) => "streaming_created",
            Self::MessagePlayStarted(_) => "message_play_started",
            Self::MessagePlayFinished(_) => "message_play_finished",
            Self::StreamingFinished(_) => "streaming_finished",
        }
    }

    pub fn streaming_id(&self) -> uuid::Uuid {
        match self {
            Self::StreamingCreated(s) | Self::StreamingFinished(s) => s.id,
            Self::MessagePlayStarted(m) | Self::MessagePlayFinished(m) => m.streaming_id,
        }
    }
}

/// Publishing never blocks the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: Event);
}

/// Fans events out to in-process subscribers over a broadcast channel.
pub struct BroadcastEventPublisher {
    tx: broadcast::Sender<Event>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: Event) {
        info!(
            event = event.name(),
            streaming_id = %event.streaming_id(),
            "Publishing event"
        );

        if self.tx.send(event).is_err() {
            debug!("No event subscribers");
        }
    }
}
