//! Domain events.
//!
//! Pipeline stages and the gateway publish events as they work through a
//! request; anything that wants to observe the flow (the log mirror, tests)
//! subscribes. Delivery is lossy: a slow subscriber lags, it never blocks
//! a publisher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything the system announces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A chat was created from a problem URL
    ChatCreated {
        chat_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Older turns were condensed into a rolling summary
    SummaryGenerated {
        turns_condensed: usize,
        timestamp: DateTime<Utc>,
    },

    /// The generator produced a draft reply
    ReplyDrafted {
        level: u8,
        model: String,
        timestamp: DateTime<Utc>,
    },

    /// Extracted code was sent to the execution service
    CodeExecuted {
        language: String,
        succeeded: bool,
        timestamp: DateTime<Utc>,
    },

    /// The judge reached a verdict
    VerdictReached {
        passed: bool,
        round: u32,
        timestamp: DateTime<Utc>,
    },

    /// The pipeline settled on the reply sent back to the user
    ReplyFinalized {
        resolution: String,
        timestamp: DateTime<Utc>,
    },

    /// Something failed mid-flow
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Fan-out bus over `tokio::sync::broadcast`.
///
/// Every subscriber sees every event and filters for what it cares about.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// A bus that buffers up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Hand an event to whoever is listening. No subscribers is not an error.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(Arc::new(event));
    }

    /// Open a new subscription starting from the next published event.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
