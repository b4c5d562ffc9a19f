//! Session lifecycle state machine tied to the billing clock.
//!
//! The coordinator is pure state: every method takes the current monotonic
//! instant as a parameter and performs no IO, which keeps the lifecycle
//! and billing arithmetic unit-testable without a runtime. The owning
//! actor supplies real instants, drives the ledger, and persists the
//! session row.
//!
//! Billing model: an accumulated-active-duration clock. Active seconds
//! accumulate only while the status is `active`; the clock freezes across
//! `paused` spans and the Nth debit falls due exactly when the clock
//! crosses N whole minutes. Pausing neither re-bills nor discards the
//! partial minute in progress -- it is carried and, if the session ends
//! before completing it, never billed.

use chrono::{DateTime, Utc};
use samvad_types::error::SessionError;
use samvad_types::session::{ConsultationSession, EndReason, SessionStatus, SessionSummary};
use tokio::time::Instant;

use std::time::Duration;

/// Lifecycle and billing state for one session.
#[derive(Debug)]
pub struct Coordinator {
    session: ConsultationSession,
    /// Whole minutes successfully debited so far.
    minutes_debited: u64,
    /// Active time accumulated before the current active span.
    active_accumulated: Duration,
    /// Start of the current active span, while `active`.
    active_since: Option<Instant>,
    /// Deadline for the pause grace timer, while `paused`.
    grace_deadline: Option<Instant>,
}

impl Coordinator {
    /// Wrap a persisted session.
    ///
    /// For a session resumed across a process restart the clock restarts
    /// from the debited floor: any unbilled partial minute in flight at
    /// crash time is forgotten in the customer's favor.
    pub fn new(session: ConsultationSession) -> Self {
        let minutes_debited = session.billed_seconds / 60;
        Self {
            active_accumulated: Duration::from_secs(minutes_debited * 60),
            active_since: None,
            grace_deadline: None,
            minutes_debited,
            session,
        }
    }

    pub fn session(&self) -> &ConsultationSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn minutes_debited(&self) -> u64 {
        self.minutes_debited
    }

    /// Seconds of active clock time elapsed so far.
    pub fn elapsed_active(&self, now: Instant) -> Duration {
        match self.active_since {
            Some(since) => self.active_accumulated + now.saturating_duration_since(since),
            None => self.active_accumulated,
        }
    }

    /// Start or resume the billing clock.
    ///
    /// Valid from `pending` (first activation; records `started_at`) and
    /// from `paused` (resume; cancels the grace timer). The clock
    /// continues from the frozen value -- elapsed seconds are continuous
    /// across a pause.
    pub fn activate(&mut self, now: Instant, wall: DateTime<Utc>) -> Result<(), SessionError> {
        match self.session.status {
            SessionStatus::Pending => {
                self.session.started_at = Some(wall);
            }
            SessionStatus::Paused => {}
            SessionStatus::Active => return Ok(()),
            SessionStatus::Ended => return Err(SessionError::Ended),
        }
        self.session.status = SessionStatus::Active;
        self.active_since = Some(now);
        self.grace_deadline = None;
        Ok(())
    }

    /// Freeze the clock and start the grace timer.
    ///
    /// Valid only from `active` (the roster just emptied).
    pub fn pause(&mut self, now: Instant, grace: Duration) -> Result<(), SessionError> {
        match self.session.status {
            SessionStatus::Active => {}
            SessionStatus::Ended => return Err(SessionError::Ended),
            other => return Err(SessionError::InvalidState(other)),
        }
        if let Some(since) = self.active_since.take() {
            self.active_accumulated += now.saturating_duration_since(since);
        }
        self.session.status = SessionStatus::Paused;
        self.grace_deadline = Some(now + grace);
        Ok(())
    }

    /// Instant at which the next whole-minute debit falls due.
    ///
    /// `None` unless the session is `active`. The deadline is exact: the
    /// owning actor recomputes it every loop iteration, so cancelling is
    /// simply leaving `active`.
    pub fn next_debit_deadline(&self) -> Option<Instant> {
        let since = self.active_since?;
        let due_at = Duration::from_secs((self.minutes_debited + 1) * 60);
        Some(since + due_at.saturating_sub(self.active_accumulated))
    }

    /// Grace timer deadline, while `paused`.
    pub fn grace_deadline(&self) -> Option<Instant> {
        self.grace_deadline
    }

    /// Record one successfully debited minute.
    pub fn record_debit(&mut self) {
        self.minutes_debited += 1;
        self.session.billed_seconds = self.minutes_debited * 60;
    }

    /// Transition to the terminal state.
    ///
    /// Idempotent once ended. Freezes the clock; the partial minute in
    /// flight is never billed.
    pub fn end(&mut self, reason: EndReason, now: Instant, wall: DateTime<Utc>) {
        if self.session.status == SessionStatus::Ended {
            return;
        }
        if let Some(since) = self.active_since.take() {
            self.active_accumulated += now.saturating_duration_since(since);
        }
        self.grace_deadline = None;
        self.session.status = SessionStatus::Ended;
        self.session.ended_at = Some(wall);
        self.session.end_reason = Some(reason);
    }

    /// Final summary for reporting consumers. Only meaningful once ended.
    pub fn summary(&self, message_count: u64) -> SessionSummary {
        SessionSummary {
            session_id: self.session.id,
            customer_id: self.session.customer_id,
            provider_id: self.session.provider_id,
            end_reason: self.session.end_reason.unwrap_or(EndReason::Timeout),
            billed_seconds: self.session.billed_seconds,
            total_cost: self.session.total_cost(),
            message_count,
            ended_at: self.session.ended_at.unwrap_or_else(Utc::now),
        }
    }
}
