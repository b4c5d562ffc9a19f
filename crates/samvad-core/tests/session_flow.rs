//! End-to-end session lifecycle tests over in-memory collaborators.
//!
//! These tests drive the registry/actor stack exactly as the WebSocket
//! gateway does -- commands in, frames out -- with the tokio clock paused
//! so billing ticks and grace timers run deterministically.

use chrono::Utc;
use samvad_core::events::{SessionEvent, SessionEventBus};
use samvad_core::ledger::Ledger;
use samvad_core::repository::{MessageRepository, SessionRepository};
use samvad_core::session::command::SessionCommand;
use samvad_core::session::registry::{SessionHandle, SessionRegistry};
use samvad_types::config::SessionPolicy;
use samvad_types::connection::PartyRole;
use samvad_types::error::{LedgerError, RepositoryError, SessionError};
use samvad_types::frame::{ErrorCode, ServerFrame};
use samvad_types::message::ChatMessage;
use samvad_types::session::{ConsultationSession, EndReason, SessionStatus};
use tokio::sync::mpsc;
use uuid::Uuid;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// In-memory collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryLedger {
    balances: Mutex<HashMap<Uuid, i64>>,
    debits: AtomicU32,
    unavailable: AtomicBool,
}

impl MemoryLedger {
    fn with_balance(customer_id: Uuid, balance: i64) -> Self {
        let ledger = Self::default();
        ledger.balances.lock().unwrap().insert(customer_id, balance);
        ledger
    }

    fn balance_of(&self, customer_id: &Uuid) -> i64 {
        *self.balances.lock().unwrap().get(customer_id).unwrap_or(&0)
    }

    fn debit_count(&self) -> u32 {
        self.debits.load(Ordering::SeqCst)
    }
}

impl Ledger for MemoryLedger {
    async fn balance(&self, customer_id: &Uuid) -> Result<i64, LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("ledger offline".to_string()));
        }
        Ok(self.balance_of(customer_id))
    }

    async fn debit(&self, customer_id: &Uuid, amount: i64) -> Result<i64, LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("ledger offline".to_string()));
        }
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.get_mut(customer_id).ok_or(LedgerError::NoWallet)?;
        if *balance < amount {
            return Err(LedgerError::Insufficient);
        }
        *balance -= amount;
        self.debits.fetch_add(1, Ordering::SeqCst);
        Ok(*balance)
    }
}

#[derive(Default)]
struct MemorySessionRepo {
    rows: Mutex<HashMap<Uuid, ConsultationSession>>,
}

impl MemorySessionRepo {
    fn insert(&self, session: ConsultationSession) {
        self.rows.lock().unwrap().insert(session.id, session);
    }

    fn status_of(&self, session_id: &Uuid) -> Option<SessionStatus> {
        self.rows.lock().unwrap().get(session_id).map(|s| s.status)
    }

    fn row(&self, session_id: &Uuid) -> Option<ConsultationSession> {
        self.rows.lock().unwrap().get(session_id).cloned()
    }
}

impl SessionRepository for MemorySessionRepo {
    async fn create(&self, session: &ConsultationSession) -> Result<(), RepositoryError> {
        self.insert(session.clone());
        Ok(())
    }

    async fn get(&self, session_id: &Uuid) -> Result<Option<ConsultationSession>, RepositoryError> {
        Ok(self.row(session_id))
    }

    async fn update(&self, session: &ConsultationSession) -> Result<(), RepositoryError> {
        self.insert(session.clone());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &Uuid,
        _limit: i64,
        _offset: i64,
    ) -> Result<Vec<ConsultationSession>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.customer_id == *user_id || s.provider_id == *user_id)
            .cloned()
            .collect())
    }

    async fn find_live_for_customer(
        &self,
        customer_id: &Uuid,
    ) -> Result<Option<ConsultationSession>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|s| {
                s.customer_id == *customer_id
                    && matches!(s.status, SessionStatus::Active | SessionStatus::Paused)
            })
            .cloned())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.rows.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
struct MemoryMessageRepo {
    rows: Mutex<Vec<ChatMessage>>,
    fail_appends: AtomicBool,
}

impl MemoryMessageRepo {
    fn stored(&self, session_id: &Uuid) -> Vec<ChatMessage> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.session_id == *session_id)
            .cloned()
            .collect()
    }
}

impl MessageRepository for MemoryMessageRepo {
    async fn append(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|m| {
            m.session_id == message.session_id
                && (m.idempotency_token == message.idempotency_token || m.seq == message.seq)
        }) {
            return Err(RepositoryError::Conflict("duplicate message".to_string()));
        }
        rows.push(message.clone());
        Ok(())
    }

    async fn find_by_token(
        &self,
        session_id: &Uuid,
        idempotency_token: &str,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.session_id == *session_id && m.idempotency_token == idempotency_token)
            .cloned())
    }

    async fn list(
        &self,
        session_id: &Uuid,
        _limit: i64,
        _offset: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages = self.stored(session_id);
        messages.sort_by_key(|m| m.seq);
        Ok(messages)
    }

    async fn count(&self, session_id: &Uuid) -> Result<u64, RepositoryError> {
        Ok(self.stored(session_id).len() as u64)
    }

    async fn max_seq(&self, session_id: &Uuid) -> Result<u64, RepositoryError> {
        Ok(self
            .stored(session_id)
            .iter()
            .map(|m| m.seq)
            .max()
            .unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

type TestRegistry = SessionRegistry<MemoryLedger, MemorySessionRepo, MemoryMessageRepo>;

struct Harness {
    registry: TestRegistry,
    ledger: Arc<MemoryLedger>,
    sessions: Arc<MemorySessionRepo>,
    messages: Arc<MemoryMessageRepo>,
    session_id: Uuid,
    customer_id: Uuid,
}

impl Harness {
    /// One pending session, customer funded with `balance`, given policy.
    fn new(rate: i64, balance: i64, policy: SessionPolicy) -> Self {
        let customer_id = Uuid::now_v7();
        let provider_id = Uuid::now_v7();
        let session = ConsultationSession::new(customer_id, provider_id, rate);
        let session_id = session.id;

        let ledger = Arc::new(MemoryLedger::with_balance(customer_id, balance));
        let sessions = Arc::new(MemorySessionRepo::default());
        sessions.insert(session);
        let messages = Arc::new(MemoryMessageRepo::default());

        let registry = SessionRegistry::new(
            Arc::clone(&ledger),
            Arc::clone(&sessions),
            Arc::clone(&messages),
            policy,
            SessionEventBus::new(),
        );

        Self {
            registry,
            ledger,
            sessions,
            messages,
            session_id,
            customer_id,
        }
    }

    async fn attach(
        &self,
        role: PartyRole,
    ) -> Result<(Uuid, SessionHandle, mpsc::Receiver<ServerFrame>), SessionError> {
        let handle = self.registry.handle(&self.session_id).await?;
        let (tx, rx) = mpsc::channel(64);
        let connection_id = Uuid::now_v7();
        handle.attach(role, connection_id, tx).await?;
        Ok((connection_id, handle, rx))
    }

    /// Attach and swallow the greeting frames (connection_established +
    /// session_state).
    async fn attach_settled(
        &self,
        role: PartyRole,
    ) -> (Uuid, SessionHandle, mpsc::Receiver<ServerFrame>) {
        let (connection_id, handle, mut rx) = self.attach(role).await.unwrap();
        let first = rx.recv().await.expect("connection_established");
        assert!(matches!(first, ServerFrame::ConnectionEstablished { .. }));
        let second = rx.recv().await.expect("session_state");
        assert!(matches!(second, ServerFrame::SessionState { .. }));
        (connection_id, handle, rx)
    }

    async fn wait_status(&self, expected: SessionStatus) {
        for _ in 0..200 {
            if self.sessions.status_of(&self.session_id) == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "session never reached {expected}, stuck at {:?}",
            self.sessions.status_of(&self.session_id)
        );
    }
}

/// Relaxed policy: liveness effectively off, so tests control detach.
fn lenient_policy() -> SessionPolicy {
    SessionPolicy {
        grace_secs: 45,
        heartbeat_window_secs: 86_400,
        liveness_sweep_secs: 3600,
        ..SessionPolicy::default()
    }
}

async fn submit(handle: &SessionHandle, connection_id: Uuid, role: PartyRole, body: &str, token: &str) {
    handle
        .send(SessionCommand::Submit {
            connection_id,
            role,
            body: body.to_string(),
            idempotency_token: token.to_string(),
        })
        .await
        .unwrap();
}

/// Next chat frame, skipping billing-tick `session_state` frames that may
/// be interleaved.
async fn expect_chat(rx: &mut mpsc::Receiver<ServerFrame>) -> (u64, PartyRole, String) {
    loop {
        match rx.recv().await.expect("chat frame") {
            ServerFrame::ChatMessage {
                sequence,
                sender_role,
                body,
                ..
            } => return (sequence, sender_role, body),
            ServerFrame::SessionState { .. } => continue,
            other => panic!("expected chat_message, got {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sequencing and dedup
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn sequences_are_strictly_increasing_without_gaps() {
    let h = Harness::new(1000, 1_000_000, lenient_policy());
    let (customer_conn, handle, mut customer_rx) = h.attach_settled(PartyRole::Customer).await;
    let (_, _, mut provider_rx) = h.attach_settled(PartyRole::Provider).await;

    for i in 1..=5u64 {
        submit(&handle, customer_conn, PartyRole::Customer, &format!("msg {i}"), &format!("tok-{i}")).await;
        let (ack_seq, _, _) = expect_chat(&mut customer_rx).await;
        let (seen_seq, sender, _) = expect_chat(&mut provider_rx).await;
        assert_eq!(ack_seq, i);
        assert_eq!(seen_seq, i);
        assert_eq!(sender, PartyRole::Customer);
    }

    let stored = h.messages.list(&h.session_id, 100, 0).await.unwrap();
    let seqs: Vec<u64> = stored.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn duplicate_token_returns_original_sequence_with_one_broadcast() {
    let h = Harness::new(1000, 1_000_000, lenient_policy());
    let (customer_conn, handle, mut customer_rx) = h.attach_settled(PartyRole::Customer).await;
    let (_, _, mut provider_rx) = h.attach_settled(PartyRole::Provider).await;

    // Original submission: ack to sender, broadcast to observer.
    submit(&handle, customer_conn, PartyRole::Customer, "hello", "a1").await;
    let (first_seq, _, _) = expect_chat(&mut customer_rx).await;
    let (observed_seq, _, _) = expect_chat(&mut provider_rx).await;
    assert_eq!(first_seq, 1);
    assert_eq!(observed_seq, 1);

    // The ack was "lost"; the client retries with the same token.
    submit(&handle, customer_conn, PartyRole::Customer, "hello", "a1").await;
    let (retry_seq, _, body) = expect_chat(&mut customer_rx).await;
    assert_eq!(retry_seq, 1);
    assert_eq!(body, "hello");

    // The observer saw exactly one broadcast for this token: the re-ack
    // above is the synchronization point proving the retry was processed.
    assert!(provider_rx.try_recv().is_err());
    assert_eq!(h.messages.count(&h.session_id).await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_persist_consumes_no_sequence() {
    let h = Harness::new(1000, 1_000_000, lenient_policy());
    let (customer_conn, handle, mut customer_rx) = h.attach_settled(PartyRole::Customer).await;

    h.messages.fail_appends.store(true, Ordering::SeqCst);
    submit(&handle, customer_conn, PartyRole::Customer, "first try", "t-1").await;
    match customer_rx.recv().await.unwrap() {
        ServerFrame::Error { code, .. } => assert_eq!(code, ErrorCode::StorageFailure),
        other => panic!("expected storage error, got {other:?}"),
    }

    // Store recovers; the retried token takes sequence 1 -- no gap.
    h.messages.fail_appends.store(false, Ordering::SeqCst);
    submit(&handle, customer_conn, PartyRole::Customer, "first try", "t-1").await;
    let (seq, _, _) = expect_chat(&mut customer_rx).await;
    assert_eq!(seq, 1);
}

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn session_never_bills_past_the_customer_balance() {
    // Balance covers exactly 3 minutes at rate 1000.
    let h = Harness::new(1000, 3000, lenient_policy());
    let (_, _, mut customer_rx) = h.attach_settled(PartyRole::Customer).await;
    let (_, _, _provider_rx) = h.attach_settled(PartyRole::Provider).await;

    // 4+ minutes of wall clock: debits at 60/120/180 succeed, the one at
    // 240 is refused and ends the session.
    tokio::time::sleep(Duration::from_secs(250)).await;

    h.wait_status(SessionStatus::Ended).await;
    assert_eq!(h.ledger.debit_count(), 3);
    assert_eq!(h.ledger.balance_of(&h.customer_id), 0);

    let row = h.sessions.row(&h.session_id).unwrap();
    assert_eq!(row.billed_seconds, 180);
    assert_eq!(row.end_reason, Some(EndReason::BalanceExhausted));

    // The terminal frame reached the attached customer.
    let mut saw_ended = false;
    while let Ok(frame) = customer_rx.try_recv() {
        if matches!(
            frame,
            ServerFrame::SessionEnded {
                reason: EndReason::BalanceExhausted
            }
        ) {
            saw_ended = true;
        }
    }
    assert!(saw_ended);
}

#[tokio::test(start_paused = true)]
async fn attach_is_rejected_when_balance_below_one_minute() {
    let h = Harness::new(1000, 999, lenient_policy());

    let err = h.attach(PartyRole::Customer).await.unwrap_err();
    assert!(matches!(err, SessionError::BalanceExhausted));

    h.wait_status(SessionStatus::Ended).await;
    let row = h.sessions.row(&h.session_id).unwrap();
    assert_eq!(row.end_reason, Some(EndReason::BalanceExhausted));
    assert_eq!(h.ledger.debit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn ledger_outage_ends_the_session_instead_of_running_unbilled() {
    let h = Harness::new(1000, 10_000, lenient_policy());
    let (_, _, _customer_rx) = h.attach_settled(PartyRole::Customer).await;

    h.ledger.unavailable.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(61)).await;

    h.wait_status(SessionStatus::Ended).await;
    let row = h.sessions.row(&h.session_id).unwrap();
    assert_eq!(row.end_reason, Some(EndReason::BalanceExhausted));
    assert_eq!(row.billed_seconds, 0);
}

// ---------------------------------------------------------------------------
// Pause / resume / grace
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn reattach_within_grace_resumes_a_continuous_clock() {
    let policy = SessionPolicy {
        grace_secs: 60,
        ..lenient_policy()
    };
    let h = Harness::new(1000, 1_000_000, policy);
    let (customer_conn, handle, _customer_rx) = h.attach_settled(PartyRole::Customer).await;
    let (provider_conn, _, _provider_rx) = h.attach_settled(PartyRole::Provider).await;

    // 90 seconds of active time: exactly one debit (at 60s).
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(h.ledger.debit_count(), 1);

    // Both parties disconnect; the session pauses and the clock freezes.
    handle
        .send(SessionCommand::Detach {
            connection_id: customer_conn,
        })
        .await
        .unwrap();
    handle
        .send(SessionCommand::Detach {
            connection_id: provider_conn,
        })
        .await
        .unwrap();
    h.wait_status(SessionStatus::Paused).await;

    // 10 seconds later the provider reattaches -- within grace.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let (_, _, _rx) = h.attach_settled(PartyRole::Provider).await;
    h.wait_status(SessionStatus::Active).await;

    // The clock did not advance during the pause: 30 more seconds of
    // active time complete the second minute, not sooner.
    tokio::time::sleep(Duration::from_secs(28)).await;
    assert_eq!(h.ledger.debit_count(), 1);
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(h.ledger.debit_count(), 2);

    let row = h.sessions.row(&h.session_id).unwrap();
    assert_eq!(row.billed_seconds, 120);
}

#[tokio::test(start_paused = true)]
async fn grace_expiry_ends_the_session_with_timeout() {
    let policy = SessionPolicy {
        grace_secs: 45,
        ..lenient_policy()
    };
    let h = Harness::new(1000, 1_000_000, policy);
    let (customer_conn, handle, _customer_rx) = h.attach_settled(PartyRole::Customer).await;

    tokio::time::sleep(Duration::from_secs(75)).await;
    handle
        .send(SessionCommand::Detach {
            connection_id: customer_conn,
        })
        .await
        .unwrap();
    h.wait_status(SessionStatus::Paused).await;

    // Nobody comes back within the 45s grace window.
    tokio::time::sleep(Duration::from_secs(46)).await;
    h.wait_status(SessionStatus::Ended).await;

    let row = h.sessions.row(&h.session_id).unwrap();
    assert_eq!(row.end_reason, Some(EndReason::Timeout));
    // One whole minute billed; the 15s partial minute is not.
    assert_eq!(row.billed_seconds, 60);

    // The session is gone for good: no further attach, no submissions.
    let err = h.registry.handle(&h.session_id).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Ended | SessionError::Unavailable
    ));
}

#[tokio::test(start_paused = true)]
async fn heartbeat_silence_force_detaches_and_pauses() {
    let policy = SessionPolicy {
        heartbeat_window_secs: 30,
        liveness_sweep_secs: 5,
        grace_secs: 600,
        ..SessionPolicy::default()
    };
    let h = Harness::new(1000, 1_000_000, policy);
    let (_, _, _customer_rx) = h.attach_settled(PartyRole::Customer).await;

    // No heartbeats at all: the sweep reaps the connection after ~30s
    // and the empty roster pauses the session.
    tokio::time::sleep(Duration::from_secs(40)).await;
    h.wait_status(SessionStatus::Paused).await;
}

#[tokio::test(start_paused = true)]
async fn heartbeats_keep_a_connection_alive() {
    let policy = SessionPolicy {
        heartbeat_window_secs: 30,
        liveness_sweep_secs: 5,
        ..lenient_policy()
    };
    let h = Harness::new(1000, 1_000_000, policy);
    let (customer_conn, handle, _customer_rx) = h.attach_settled(PartyRole::Customer).await;

    for _ in 0..8 {
        tokio::time::sleep(Duration::from_secs(10)).await;
        handle
            .send(SessionCommand::Heartbeat {
                connection_id: customer_conn,
            })
            .await
            .unwrap();
    }

    assert_eq!(h.sessions.status_of(&h.session_id), Some(SessionStatus::Active));
}

// ---------------------------------------------------------------------------
// Typing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn typing_signals_bypass_sequencing_and_persistence() {
    let h = Harness::new(1000, 1_000_000, lenient_policy());
    let (customer_conn, handle, mut customer_rx) = h.attach_settled(PartyRole::Customer).await;
    let (_, _, mut provider_rx) = h.attach_settled(PartyRole::Provider).await;

    handle
        .send(SessionCommand::Typing {
            connection_id: customer_conn,
            role: PartyRole::Customer,
            is_typing: true,
        })
        .await
        .unwrap();

    match provider_rx.recv().await.unwrap() {
        ServerFrame::TypingIndicator {
            sender_role,
            is_typing,
        } => {
            assert_eq!(sender_role, PartyRole::Customer);
            assert!(is_typing);
        }
        other => panic!("expected typing_indicator, got {other:?}"),
    }

    // A chat message after the typing signal still takes sequence 1, and
    // the store holds no trace of the signal.
    submit(&handle, customer_conn, PartyRole::Customer, "hi", "t1").await;
    let (seq, _, _) = expect_chat(&mut customer_rx).await;
    assert_eq!(seq, 1);
    assert_eq!(h.messages.count(&h.session_id).await.unwrap(), 1);

    // No self-echo of the typing signal.
    assert!(customer_rx.try_recv().is_err());
}

// ---------------------------------------------------------------------------
// Reconnect / supersede / policy
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn reconnect_supersedes_prior_connection_without_ending_session() {
    let h = Harness::new(1000, 1_000_000, lenient_policy());
    let (_, _, mut first_rx) = h.attach_settled(PartyRole::Customer).await;
    let (_, handle, _second_rx) = h.attach_settled(PartyRole::Customer).await;

    // The first socket's queue closes when its roster entry is dropped.
    assert!(first_rx.recv().await.is_none());
    assert_eq!(h.sessions.status_of(&h.session_id), Some(SessionStatus::Active));

    // The surviving connection still works.
    drop(handle);
}

#[tokio::test(start_paused = true)]
async fn second_live_session_for_a_customer_is_rejected() {
    let h = Harness::new(1000, 1_000_000, lenient_policy());
    let (_, _, _rx) = h.attach_settled(PartyRole::Customer).await;

    // A second pending session for the same customer.
    let other = ConsultationSession::new(h.customer_id, Uuid::now_v7(), 500);
    let other_id = other.id;
    h.sessions.insert(other);

    let err = h.registry.handle(&other_id).await.unwrap_err();
    assert!(matches!(err, SessionError::CustomerBusy));
}

#[tokio::test(start_paused = true)]
async fn explicit_end_publishes_summary_and_closes_connections() {
    let h = Harness::new(1500, 1_000_000, lenient_policy());
    let mut events = h.registry.events().subscribe();

    let (customer_conn, handle, mut customer_rx) = h.attach_settled(PartyRole::Customer).await;
    let (_, _, mut provider_rx) = h.attach_settled(PartyRole::Provider).await;

    tokio::time::sleep(Duration::from_secs(130)).await;
    submit(&handle, customer_conn, PartyRole::Customer, "thanks, bye", "bye-1").await;
    let _ = expect_chat(&mut customer_rx).await;

    handle
        .send(SessionCommand::EndSession {
            role: PartyRole::Customer,
        })
        .await
        .unwrap();
    h.wait_status(SessionStatus::Ended).await;

    let SessionEvent::Ended { summary } = events.recv().await.unwrap();
    assert_eq!(summary.end_reason, EndReason::CustomerEnded);
    assert_eq!(summary.billed_seconds, 120);
    assert_eq!(summary.total_cost, 3000);
    assert_eq!(summary.message_count, 1);

    // Both parties got the terminal frame before their sockets closed.
    for rx in [&mut customer_rx, &mut provider_rx] {
        let mut saw_ended = false;
        while let Some(frame) = rx.recv().await {
            if matches!(frame, ServerFrame::SessionEnded { .. }) {
                saw_ended = true;
            }
        }
        assert!(saw_ended);
    }
}

#[tokio::test(start_paused = true)]
async fn submit_against_paused_session_is_rejected() {
    let h = Harness::new(1000, 1_000_000, lenient_policy());
    let (customer_conn, handle, mut customer_rx) = h.attach_settled(PartyRole::Customer).await;

    handle
        .send(SessionCommand::Detach {
            connection_id: customer_conn,
        })
        .await
        .unwrap();
    h.wait_status(SessionStatus::Paused).await;

    // The gateway would normally be gone with the socket; this models a
    // frame racing the detach.
    submit(&handle, customer_conn, PartyRole::Customer, "anyone there?", "late-1").await;

    // No connection is attached anymore, so nothing is delivered -- but
    // nothing was sequenced either.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.messages.count(&h.session_id).await.unwrap(), 0);
    assert!(customer_rx.try_recv().is_err());
}
