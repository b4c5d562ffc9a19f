//! Session event bus for reporting consumers.
//!
//! A thin tokio `broadcast` wrapper: when a session ends, its final
//! summary is published here for history/reporting pages. Lagged or
//! absent subscribers never affect session processing.

use samvad_types::session::SessionSummary;
use tokio::sync::broadcast;

/// Buffer size for the session event broadcast channel.
const EVENT_BUFFER: usize = 256;

/// Events published by the session subsystem.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session reached its terminal state.
    Ended { summary: SessionSummary },
}

/// Broadcast bus for [`SessionEvent`]s.
#[derive(Debug, Clone)]
pub struct SessionEventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers. Returns the number of
    /// receivers the event reached; zero subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new()
    }
}
