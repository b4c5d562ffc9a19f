//! Commands accepted by a session actor.
//!
//! Every externally-triggered session event enters through this enum and
//! is applied in arrival order by the actor's single processing loop.
//! Timer-driven events (billing ticks, grace expiry, liveness sweeps) are
//! internal to the actor and have no command representation.

use samvad_types::connection::PartyRole;
use samvad_types::error::SessionError;
use samvad_types::frame::ServerFrame;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// One inbound event for a session's serialized processor.
#[derive(Debug)]
pub enum SessionCommand {
    /// A gateway wants to attach a freshly authenticated connection.
    /// The reply resolves once the attach has been applied (or rejected);
    /// all subsequent traffic flows through `outbound`.
    Attach {
        role: PartyRole,
        connection_id: Uuid,
        outbound: mpsc::Sender<ServerFrame>,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// A connection's socket closed (gracefully or not).
    Detach { connection_id: Uuid },

    /// Keep-alive from a connection; refreshes its liveness window.
    Heartbeat { connection_id: Uuid },

    /// Chat message submission from an attached connection.
    Submit {
        connection_id: Uuid,
        role: PartyRole,
        body: String,
        idempotency_token: String,
    },

    /// Typing state update from an attached connection.
    Typing {
        connection_id: Uuid,
        role: PartyRole,
        is_typing: bool,
    },

    /// Explicit end requested by a participant (WebSocket frame or REST).
    EndSession { role: PartyRole },
}
