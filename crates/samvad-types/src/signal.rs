//! Ephemeral presence/typing signal.
//!
//! Signals carry no durability: only the most recent value per
//! (session, role) is retained, superseded values are discarded, and
//! nothing is ever queued or persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::PartyRole;

/// Last-write-wins typing state for one party of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSignal {
    pub session_id: Uuid,
    pub role: PartyRole,
    pub is_typing: bool,
    pub at: DateTime<Utc>,
}
