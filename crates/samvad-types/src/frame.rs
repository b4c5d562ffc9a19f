//! Wire frame vocabulary for the WebSocket transport.
//!
//! Clients and the server exchange JSON text frames tagged by a snake_case
//! `type` field ([`ClientFrame`] inbound, [`ServerFrame`] outbound), the
//! same serde-tagged-enum convention used for every other wire surface.
//!
//! Typing indicators have an implicit expiry contract: if no refreshed
//! `typing_indicator` arrives within the configured window, observers must
//! locally treat the flag as false. The server never pushes an explicit
//! typing-timeout frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::PartyRole;
use crate::session::{EndReason, SessionStatus};

/// Incoming frame from a connected party.
///
/// Unknown or malformed frames are answered with an `error` frame and
/// otherwise ignored; they never tear down the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Submit a chat message for sequencing and fan-out.
    ChatMessage {
        body: String,
        idempotency_token: String,
    },
    /// Update the sender's typing state.
    Typing { is_typing: bool },
    /// Keep-alive; refreshes the connection's liveness window.
    Heartbeat,
    /// Explicitly end the consultation.
    EndSession,
}

/// Outgoing frame to a connected party.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once per attach, before any other frame.
    ConnectionEstablished { session_id: Uuid, role: PartyRole },
    /// Broadcast result of a sequenced submission. The submitter receives
    /// this frame too; its copy carries the assigned sequence number and
    /// doubles as the acknowledgment.
    ChatMessage {
        sequence: u64,
        sender_role: PartyRole,
        body: String,
        server_time: DateTime<Utc>,
    },
    /// Broadcast typing state of the counterpart. Never self-echoed.
    TypingIndicator { sender_role: PartyRole, is_typing: bool },
    /// Sent on attach and on every billing tick.
    SessionState {
        status: SessionStatus,
        elapsed_seconds: u64,
        balance_remaining: i64,
    },
    /// Terminal; the socket is closed immediately after.
    SessionEnded { reason: EndReason },
    /// Per-frame recoverable error, reported to the originating
    /// connection only.
    Error { code: ErrorCode, message: String },
}

/// Machine-readable error codes carried by [`ServerFrame::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Bad or expired token; connection refused before attach.
    AuthenticationFailure,
    /// Valid identity but not a participant of the requested session.
    AuthorizationFailure,
    /// Submit/typing against a session that is not `active`.
    InvalidSessionState,
    /// Unparseable or oversized frame.
    MalformedFrame,
    /// The durable message store rejected a write.
    StorageFailure,
}
