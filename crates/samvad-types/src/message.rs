//! Chat message type.
//!
//! Messages are immutable once sequenced and are never deleted by this
//! subsystem; retention is a reporting-side concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::PartyRole;

/// One sequenced chat utterance within a session.
///
/// `seq` is unique per session, assigned exactly once, starts at 1 and is
/// strictly increasing with no gaps. For a given (session, idempotency
/// token) pair at most one message is ever sequenced: a retried submission
/// resolves to the original `seq`, never a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub session_id: Uuid,
    pub seq: u64,
    pub sender_role: PartyRole,
    pub body: String,
    /// Client-supplied opaque token making submission safe to retry.
    pub idempotency_token: String,
    /// Server receipt time; defines cross-sender ordering.
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialize() {
        let msg = ChatMessage {
            session_id: Uuid::now_v7(),
            seq: 7,
            sender_role: PartyRole::Customer,
            body: "What does my chart say about this year?".to_string(),
            idempotency_token: "tok-1".to_string(),
            received_at: Utc::now(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"seq\":7"));
        assert!(json.contains("\"sender_role\":\"customer\""));
    }
}
