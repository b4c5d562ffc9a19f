//! Best-effort typing state, last-write-wins per (session, role).
//!
//! Explicitly outside sequencing, persistence, and billing. Superseded
//! values are discarded, never queued. Expiry is a consuming-client
//! contract (see [`samvad_types::config::SessionPolicy::typing_expiry_secs`]);
//! the tracker never pushes a timeout event.

use chrono::{DateTime, Utc};
use samvad_types::connection::PartyRole;
use samvad_types::signal::TypingSignal;
use uuid::Uuid;

use std::collections::HashMap;

/// Most recent typing signal per party of one session.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    last: HashMap<PartyRole, TypingSignal>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the party's typing state, returning the new signal.
    pub fn set(
        &mut self,
        session_id: Uuid,
        role: PartyRole,
        is_typing: bool,
        at: DateTime<Utc>,
    ) -> TypingSignal {
        let signal = TypingSignal {
            session_id,
            role,
            is_typing,
            at,
        };
        self.last.insert(role, signal);
        signal
    }

    /// Last known signal for a party, if any was ever received.
    pub fn get(&self, role: PartyRole) -> Option<&TypingSignal> {
        self.last.get(&role)
    }
}
