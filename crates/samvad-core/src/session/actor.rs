//! The per-session serialized event processor.
//!
//! One actor task owns all state of one session: the lifecycle
//! [`Coordinator`], the connection [`Roster`], the message [`Sequencer`],
//! and the [`PresenceTracker`]. Attaches, detaches, submissions, typing,
//! heartbeats, billing ticks, grace expiry, and liveness sweeps are all
//! applied in one logical order by a single `tokio::select!` loop, so a
//! debit tick can never race an end-session request. Different sessions
//! run fully in parallel.
//!
//! Outbound delivery never blocks this loop: frames go through bounded
//! per-connection queues via `try_send`, and a connection whose queue
//! overflows is force-detached as if it had disconnected.

use chrono::Utc;
use samvad_types::config::SessionPolicy;
use samvad_types::connection::PartyRole;
use samvad_types::error::{LedgerError, RepositoryError, SessionError};
use samvad_types::frame::{ErrorCode, ServerFrame};
use samvad_types::message::ChatMessage;
use samvad_types::session::{ConsultationSession, EndReason, SessionStatus};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use std::sync::Arc;
use std::time::Duration;

use crate::events::{SessionEvent, SessionEventBus};
use crate::ledger::Ledger;
use crate::repository::{MessageRepository, SessionRepository};
use crate::session::command::SessionCommand;
use crate::session::coordinator::Coordinator;
use crate::session::presence::PresenceTracker;
use crate::session::roster::{ConnectionEntry, Roster};
use crate::session::sequencer::Sequencer;

/// Deadline placeholder for disabled select branches. Never awaited:
/// the branch guard is false whenever this value is used.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365)
}

/// Serialized processor for one session.
pub struct SessionActor<L, S, M> {
    coordinator: Coordinator,
    roster: Roster,
    sequencer: Sequencer,
    presence: PresenceTracker,
    policy: SessionPolicy,
    ledger: Arc<L>,
    sessions: Arc<S>,
    messages: Arc<M>,
    events: SessionEventBus,
    rx: mpsc::Receiver<SessionCommand>,
    cancel: CancellationToken,
    /// Balance observed at the most recent ledger interaction; carried in
    /// `session_state` frames so attach never needs a second ledger read.
    last_known_balance: i64,
}

impl<L, S, M> SessionActor<L, S, M>
where
    L: Ledger,
    S: SessionRepository,
    M: MessageRepository,
{
    pub fn new(
        session: ConsultationSession,
        max_persisted_seq: u64,
        ledger: Arc<L>,
        sessions: Arc<S>,
        messages: Arc<M>,
        policy: SessionPolicy,
        events: SessionEventBus,
        rx: mpsc::Receiver<SessionCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            coordinator: Coordinator::new(session),
            roster: Roster::new(),
            sequencer: Sequencer::new(max_persisted_seq),
            presence: PresenceTracker::new(),
            policy,
            ledger,
            sessions,
            messages,
            events,
            rx,
            cancel,
            last_known_balance: 0,
        }
    }

    /// Run until the session ends, the command channel closes, or the
    /// registry cancels us (server shutdown).
    pub async fn run(mut self) {
        let session_id = self.coordinator.session().id;
        debug!(%session_id, status = %self.coordinator.status(), "session actor started");

        let mut sweep =
            tokio::time::interval(Duration::from_secs(self.policy.liveness_sweep_secs.max(1)));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.coordinator.status() == SessionStatus::Ended {
                break;
            }

            let debit_at = self.coordinator.next_debit_deadline();
            let grace_at = self.coordinator.grace_deadline();

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.persist_session().await;
                    info!(%session_id, "session actor stopping on shutdown");
                    break;
                }

                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    // Registry dropped the handle; nothing can reach us.
                    None => break,
                },

                _ = tokio::time::sleep_until(debit_at.unwrap_or_else(far_future)),
                    if debit_at.is_some() =>
                {
                    self.on_debit_due().await;
                }

                _ = tokio::time::sleep_until(grace_at.unwrap_or_else(far_future)),
                    if grace_at.is_some() =>
                {
                    info!(%session_id, "grace timer expired with no reattach");
                    self.terminate(EndReason::Timeout).await;
                }

                _ = sweep.tick() => self.sweep_liveness().await,
            }
        }

        debug!(%session_id, "session actor stopped");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Attach {
                role,
                connection_id,
                outbound,
                reply,
            } => {
                let result = self.handle_attach(role, connection_id, outbound).await;
                let _ = reply.send(result);
            }
            SessionCommand::Detach { connection_id } => {
                self.handle_detach(connection_id).await;
            }
            SessionCommand::Heartbeat { connection_id } => {
                self.roster.heartbeat(&connection_id, Instant::now());
            }
            SessionCommand::Submit {
                connection_id,
                role,
                body,
                idempotency_token,
            } => {
                self.handle_submit(connection_id, role, body, idempotency_token)
                    .await;
            }
            SessionCommand::Typing {
                connection_id,
                role,
                is_typing,
            } => {
                self.handle_typing(connection_id, role, is_typing).await;
            }
            SessionCommand::EndSession { role } => {
                let reason = match role {
                    PartyRole::Customer => EndReason::CustomerEnded,
                    PartyRole::Provider => EndReason::ProviderEnded,
                };
                info!(session_id = %self.coordinator.session().id, %role, "explicit end requested");
                self.terminate(reason).await;
            }
        }
    }

    // -----------------------------------------------------------------
    // Attach / detach
    // -----------------------------------------------------------------

    async fn handle_attach(
        &mut self,
        role: PartyRole,
        connection_id: Uuid,
        outbound: mpsc::Sender<ServerFrame>,
    ) -> Result<(), SessionError> {
        let now = Instant::now();
        let session_id = self.coordinator.session().id;

        match self.coordinator.status() {
            SessionStatus::Ended => return Err(SessionError::Ended),

            // First-ever attach: gate on the customer covering at least
            // one minute at the session rate, else end immediately.
            SessionStatus::Pending => {
                let customer_id = self.coordinator.session().customer_id;
                let rate = self.coordinator.session().rate_per_minute;
                match self.ledger.balance(&customer_id).await {
                    Ok(balance) if balance >= rate => {
                        self.last_known_balance = balance;
                    }
                    Ok(balance) => {
                        info!(%session_id, balance, rate, "attach rejected, balance below one minute");
                        self.terminate(EndReason::BalanceExhausted).await;
                        return Err(SessionError::BalanceExhausted);
                    }
                    Err(err) => {
                        error!(%session_id, error = %err, "ledger unavailable during balance gate");
                        self.terminate(EndReason::BalanceExhausted).await;
                        return Err(SessionError::BalanceExhausted);
                    }
                }
                self.coordinator.activate(now, Utc::now())?;
                self.persist_session().await;
                info!(%session_id, %role, "session activated");
            }

            // Reattach within grace: cancel the timer, resume the clock.
            SessionStatus::Paused => {
                self.coordinator.activate(now, Utc::now())?;
                self.persist_session().await;
                info!(%session_id, %role, "session resumed from pause");
            }

            SessionStatus::Active => {}
        }

        let entry = ConnectionEntry::new(connection_id, role, outbound, now);
        if let Some(superseded) = self.roster.attach(entry) {
            debug!(
                %session_id,
                %role,
                superseded = %superseded.id,
                "new connection supersedes prior attachment"
            );
        }

        // Greeting frames go through the (freshly attached) queue; the
        // gateway starts draining it right after the attach reply.
        self.roster.send_to(
            &connection_id,
            ServerFrame::ConnectionEstablished { session_id, role },
        );
        self.roster
            .send_to(&connection_id, self.state_frame(Instant::now()));

        Ok(())
    }

    async fn handle_detach(&mut self, connection_id: Uuid) {
        let session_id = self.coordinator.session().id;
        if self.roster.detach(&connection_id).is_none() {
            return;
        }
        debug!(%session_id, connection_id = %connection_id, "connection detached");

        if self.roster.is_empty() && self.coordinator.status() == SessionStatus::Active {
            let grace = Duration::from_secs(self.policy.grace_secs);
            if self.coordinator.pause(Instant::now(), grace).is_ok() {
                self.persist_session().await;
                info!(%session_id, grace_secs = self.policy.grace_secs, "all parties gone, pausing");
            }
        }
    }

    async fn sweep_liveness(&mut self) {
        let window = Duration::from_secs(self.policy.heartbeat_window_secs);
        let stale = self.roster.stale_connections(Instant::now(), window);
        for connection_id in stale {
            warn!(
                session_id = %self.coordinator.session().id,
                %connection_id,
                "liveness timeout, force-detaching"
            );
            self.handle_detach(connection_id).await;
        }
    }

    // -----------------------------------------------------------------
    // Chat submission
    // -----------------------------------------------------------------

    async fn handle_submit(
        &mut self,
        connection_id: Uuid,
        role: PartyRole,
        body: String,
        idempotency_token: String,
    ) {
        let session_id = self.coordinator.session().id;

        if self.coordinator.status() != SessionStatus::Active {
            self.roster.send_to(
                &connection_id,
                ServerFrame::Error {
                    code: ErrorCode::InvalidSessionState,
                    message: format!("session is {}", self.coordinator.status()),
                },
            );
            return;
        }

        let body = body.trim();
        if body.is_empty() {
            return;
        }
        if body.len() > self.policy.max_body_bytes {
            self.roster.send_to(
                &connection_id,
                ServerFrame::Error {
                    code: ErrorCode::MalformedFrame,
                    message: format!("body exceeds {} bytes", self.policy.max_body_bytes),
                },
            );
            return;
        }

        // Dedup fast path: token already sequenced in this process life.
        // Re-acknowledge the submitter only; observers already saw the
        // original sequence exactly once.
        if self.sequencer.known(&idempotency_token).is_some() {
            if let Ok(Some(existing)) = self
                .messages
                .find_by_token(&session_id, &idempotency_token)
                .await
            {
                debug!(%session_id, seq = existing.seq, "duplicate submission re-acknowledged");
                self.roster.send_to(&connection_id, chat_frame(&existing));
                return;
            }
            // Store lookup failed; the append below will surface a
            // conflict or a storage error either way.
        }

        let message = ChatMessage {
            session_id,
            seq: self.sequencer.peek_next(),
            sender_role: role,
            body: body.to_string(),
            idempotency_token: idempotency_token.clone(),
            received_at: Utc::now(),
        };

        // Write-ahead: nothing is fanned out (and no sequence consumed)
        // until the store accepted the message. The unique token index
        // catches duplicates from before a process restart.
        match self.messages.append(&message).await {
            Ok(()) => {
                let seq = self.sequencer.commit(&idempotency_token);
                debug!(%session_id, seq, %role, "message sequenced");
                self.fanout(chat_frame(&message), None).await;
            }
            Err(RepositoryError::Conflict(_)) => {
                match self
                    .messages
                    .find_by_token(&session_id, &idempotency_token)
                    .await
                {
                    Ok(Some(existing)) => {
                        self.sequencer.cache(&idempotency_token, existing.seq);
                        debug!(
                            %session_id,
                            seq = existing.seq,
                            "duplicate submission re-acknowledged after store conflict"
                        );
                        self.roster.send_to(&connection_id, chat_frame(&existing));
                    }
                    _ => {
                        self.roster.send_to(
                            &connection_id,
                            ServerFrame::Error {
                                code: ErrorCode::StorageFailure,
                                message: "message store unavailable".to_string(),
                            },
                        );
                    }
                }
            }
            Err(err) => {
                warn!(%session_id, error = %err, "message persist failed");
                self.roster.send_to(
                    &connection_id,
                    ServerFrame::Error {
                        code: ErrorCode::StorageFailure,
                        message: "message could not be stored, retry with the same token"
                            .to_string(),
                    },
                );
            }
        }
    }

    // -----------------------------------------------------------------
    // Typing
    // -----------------------------------------------------------------

    async fn handle_typing(&mut self, connection_id: Uuid, role: PartyRole, is_typing: bool) {
        if self.coordinator.status() != SessionStatus::Active {
            self.roster.send_to(
                &connection_id,
                ServerFrame::Error {
                    code: ErrorCode::InvalidSessionState,
                    message: format!("session is {}", self.coordinator.status()),
                },
            );
            return;
        }

        let session_id = self.coordinator.session().id;
        self.presence.set(session_id, role, is_typing, Utc::now());

        // Fire-and-forget to the counterpart; no self-echo, no ack.
        self.fanout(
            ServerFrame::TypingIndicator {
                sender_role: role,
                is_typing,
            },
            Some(role),
        )
        .await;
    }

    // -----------------------------------------------------------------
    // Billing
    // -----------------------------------------------------------------

    async fn on_debit_due(&mut self) {
        let session_id = self.coordinator.session().id;
        let customer_id = self.coordinator.session().customer_id;
        let rate = self.coordinator.session().rate_per_minute;

        match self.ledger.debit(&customer_id, rate).await {
            Ok(remaining) => {
                self.coordinator.record_debit();
                self.last_known_balance = remaining;
                self.persist_session().await;
                debug!(
                    %session_id,
                    minute = self.coordinator.minutes_debited(),
                    remaining,
                    "minute debited"
                );
                let frame = self.state_frame(Instant::now());
                self.fanout(frame, None).await;
            }
            Err(LedgerError::Insufficient) | Err(LedgerError::NoWallet) => {
                info!(%session_id, "debit refused, balance exhausted");
                self.terminate(EndReason::BalanceExhausted).await;
            }
            Err(LedgerError::Unavailable(err)) => {
                // Hard failure: ending beats running unbilled.
                error!(%session_id, error = %err, "ledger unavailable during debit");
                self.terminate(EndReason::BalanceExhausted).await;
            }
        }
    }

    // -----------------------------------------------------------------
    // Terminal transition
    // -----------------------------------------------------------------

    async fn terminate(&mut self, reason: EndReason) {
        let session_id = self.coordinator.session().id;
        self.coordinator.end(reason, Instant::now(), Utc::now());
        self.persist_session().await;

        let message_count = self
            .messages
            .count(&session_id)
            .await
            .unwrap_or_else(|err| {
                warn!(%session_id, error = %err, "message count unavailable for summary");
                0
            });

        self.roster
            .broadcast(&ServerFrame::SessionEnded { reason }, None);
        self.roster.clear();

        let summary = self.coordinator.summary(message_count);
        info!(
            %session_id,
            reason = %reason,
            billed_seconds = summary.billed_seconds,
            total_cost = summary.total_cost,
            "session ended"
        );
        self.events.publish(SessionEvent::Ended { summary });
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn state_frame(&self, now: Instant) -> ServerFrame {
        ServerFrame::SessionState {
            status: self.coordinator.status(),
            elapsed_seconds: self.coordinator.elapsed_active(now).as_secs(),
            balance_remaining: self.last_known_balance,
        }
    }

    /// Broadcast with overflow handling: connections whose queue is full
    /// or closed are force-detached (pause semantics included).
    async fn fanout(&mut self, frame: ServerFrame, exclude: Option<PartyRole>) {
        let dead = self.roster.broadcast(&frame, exclude);
        for connection_id in dead {
            warn!(
                session_id = %self.coordinator.session().id,
                %connection_id,
                "outbound queue overflow, force-detaching"
            );
            self.handle_detach(connection_id).await;
        }
    }

    async fn persist_session(&self) {
        if let Err(err) = self.sessions.update(self.coordinator.session()).await {
            // The actor remains authoritative for live state; the row is
            // a mirror and will be rewritten on the next transition.
            error!(
                session_id = %self.coordinator.session().id,
                error = %err,
                "failed to persist session row"
            );
        }
    }
}

/// Build the broadcast frame for a sequenced message.
fn chat_frame(message: &ChatMessage) -> ServerFrame {
    ServerFrame::ChatMessage {
        sequence: message.seq,
        sender_role: message.sender_role,
        body: message.body.clone(),
        server_time: message.received_at,
    }
}
