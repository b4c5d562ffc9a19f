//! Process-global registry of running session actors.
//!
//! Maps session id -> command handle (DashMap), spawning an actor on
//! demand from the persisted session row. Also enforces the marketplace
//! policy that a customer has at most one live (`active`/`paused`)
//! session at a time: claiming a second one is rejected with
//! `CustomerBusy`. When an actor terminates its entries are removed, so
//! an ended session never hands out a stale handle.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use samvad_types::config::SessionPolicy;
use samvad_types::connection::PartyRole;
use samvad_types::error::SessionError;
use samvad_types::frame::ServerFrame;
use samvad_types::session::SessionStatus;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use std::sync::Arc;

use crate::events::SessionEventBus;
use crate::ledger::Ledger;
use crate::repository::{MessageRepository, SessionRepository};
use crate::session::actor::SessionActor;
use crate::session::command::SessionCommand;

/// Buffer size for per-session command queues.
const COMMAND_BUFFER: usize = 256;

/// Cloneable handle to one running session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Enqueue a command for the session's serialized processor.
    pub async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.tx.send(cmd).await.map_err(|_| SessionError::Unavailable)
    }

    /// Attach a connection and wait for the lifecycle decision.
    pub async fn attach(
        &self,
        role: PartyRole,
        connection_id: Uuid,
        outbound: mpsc::Sender<ServerFrame>,
    ) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Attach {
            role,
            connection_id,
            outbound,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Registry spawning and routing to per-session actors.
pub struct SessionRegistry<L, S, M> {
    ledger: Arc<L>,
    sessions: Arc<S>,
    messages: Arc<M>,
    policy: SessionPolicy,
    events: SessionEventBus,
    actors: Arc<DashMap<Uuid, SessionHandle>>,
    /// customer id -> session id of their single live session.
    live_customers: Arc<DashMap<Uuid, Uuid>>,
    cancel: CancellationToken,
}

impl<L, S, M> SessionRegistry<L, S, M>
where
    L: Ledger + 'static,
    S: SessionRepository + 'static,
    M: MessageRepository + 'static,
{
    pub fn new(
        ledger: Arc<L>,
        sessions: Arc<S>,
        messages: Arc<M>,
        policy: SessionPolicy,
        events: SessionEventBus,
    ) -> Self {
        Self {
            ledger,
            sessions,
            messages,
            policy,
            events,
            actors: Arc::new(DashMap::new()),
            live_customers: Arc::new(DashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Get the handle for a session, spawning its actor if needed.
    ///
    /// Fails with `NotFound` for unknown sessions, `Ended` for terminal
    /// ones, and `CustomerBusy` when the customer already has a different
    /// live session.
    pub async fn handle(&self, session_id: &Uuid) -> Result<SessionHandle, SessionError> {
        if let Some(existing) = self.actors.get(session_id) {
            if !existing.is_closed() {
                return Ok(existing.clone());
            }
        }

        let session = self
            .sessions
            .get(session_id)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?
            .ok_or(SessionError::NotFound)?;

        if session.status == SessionStatus::Ended {
            return Err(SessionError::Ended);
        }

        // Policy gate: one live session per customer. The store check
        // covers sessions left live by a previous process life; the map
        // is the in-process authority.
        if let Some(live) = self
            .sessions
            .find_live_for_customer(&session.customer_id)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?
        {
            if live.id != session.id {
                return Err(SessionError::CustomerBusy);
            }
        }
        match self.live_customers.entry(session.customer_id) {
            Entry::Occupied(occupied) => {
                if *occupied.get() != session.id {
                    return Err(SessionError::CustomerBusy);
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(session.id);
            }
        }

        let max_seq = self
            .messages
            .max_seq(&session.id)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = SessionHandle { tx };

        let actor = SessionActor::new(
            session.clone(),
            max_seq,
            Arc::clone(&self.ledger),
            Arc::clone(&self.sessions),
            Arc::clone(&self.messages),
            self.policy.clone(),
            self.events.clone(),
            rx,
            self.cancel.child_token(),
        );

        // Two gateways can race to spawn the same session; only one actor
        // may win. The loser's channel (and unspawned actor) just drop.
        match self.actors.entry(session.id) {
            Entry::Occupied(mut occupied) => {
                if !occupied.get().is_closed() {
                    return Ok(occupied.get().clone());
                }
                occupied.insert(handle.clone());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(handle.clone());
            }
        }
        debug!(session_id = %session.id, "spawning session actor");

        let actors = Arc::clone(&self.actors);
        let live_customers = Arc::clone(&self.live_customers);
        let sid = session.id;
        let cid = session.customer_id;
        let my_tx = handle.tx.clone();
        tokio::spawn(async move {
            actor.run().await;
            // Only clean up our own entries; a respawn may already have
            // replaced them.
            actors.remove_if(&sid, |_, h| h.tx.same_channel(&my_tx));
            live_customers.remove_if(&cid, |_, live_sid| *live_sid == sid);
        });

        Ok(handle)
    }

    /// Subscribe to session lifecycle events (ended summaries).
    pub fn events(&self) -> &SessionEventBus {
        &self.events
    }

    /// Number of sessions with a running actor.
    pub fn running_sessions(&self) -> usize {
        self.actors.len()
    }

    /// Stop all session actors (graceful server shutdown). Actors persist
    /// their current row and exit without ending the sessions.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
