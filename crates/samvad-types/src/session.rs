//! Consultation session types.
//!
//! A session is one billed, bidirectional chat consultation between a
//! customer and a provider. Lifecycle state is owned exclusively by the
//! session coordinator; the wallet ledger is consulted and debited but
//! never owns lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a consultation session.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('pending', 'active', 'paused', 'ended'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, no party has attached yet.
    Pending,
    /// At least one party attached at some point and the billing clock runs.
    Active,
    /// All parties disconnected; grace timer running, clock frozen.
    Paused,
    /// Terminal.
    Ended,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Paused => write!(f, "paused"),
            SessionStatus::Ended => write!(f, "ended"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SessionStatus::Pending),
            "active" => Ok(SessionStatus::Active),
            "paused" => Ok(SessionStatus::Paused),
            "ended" => Ok(SessionStatus::Ended),
            other => Err(format!("invalid session status: '{other}'")),
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Pending
    }
}

/// Why a session reached the `ended` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    CustomerEnded,
    ProviderEnded,
    BalanceExhausted,
    Timeout,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::CustomerEnded => write!(f, "customer_ended"),
            EndReason::ProviderEnded => write!(f, "provider_ended"),
            EndReason::BalanceExhausted => write!(f, "balance_exhausted"),
            EndReason::Timeout => write!(f, "timeout"),
        }
    }
}

impl FromStr for EndReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer_ended" => Ok(EndReason::CustomerEnded),
            "provider_ended" => Ok(EndReason::ProviderEnded),
            "balance_exhausted" => Ok(EndReason::BalanceExhausted),
            "timeout" => Ok(EndReason::Timeout),
            other => Err(format!("invalid end reason: '{other}'")),
        }
    }
}

/// Kind of consultation. Only chat is carried over this subsystem;
/// voice/call consultations use a separate transport entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationKind {
    Chat,
}

impl fmt::Display for ConsultationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationKind::Chat => write!(f, "chat"),
        }
    }
}

impl FromStr for ConsultationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(ConsultationKind::Chat),
            other => Err(format!("invalid consultation kind: '{other}'")),
        }
    }
}

/// A consultation session between a customer and a provider.
///
/// `rate_per_minute` and all money amounts are integer minor currency
/// units (paise). `billed_seconds` is always a whole-minute multiple and
/// only grows while the session is `active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationSession {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub kind: ConsultationKind,
    pub rate_per_minute: i64,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub billed_seconds: u64,
    pub end_reason: Option<EndReason>,
    pub created_at: DateTime<Utc>,
}

impl ConsultationSession {
    /// Create a new pending session at the given per-minute rate.
    pub fn new(customer_id: Uuid, provider_id: Uuid, rate_per_minute: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            customer_id,
            provider_id,
            kind: ConsultationKind::Chat,
            rate_per_minute,
            status: SessionStatus::Pending,
            started_at: None,
            ended_at: None,
            billed_seconds: 0,
            end_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the session still has a live (non-terminal) lifecycle.
    pub fn is_live(&self) -> bool {
        self.status != SessionStatus::Ended
    }

    /// Total cost debited so far, in minor units.
    pub fn total_cost(&self) -> i64 {
        (self.billed_seconds / 60) as i64 * self.rate_per_minute
    }
}

/// Final session summary published for history/reporting consumers when a
/// session ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub end_reason: EndReason,
    pub billed_seconds: u64,
    pub total_cost: i64,
    pub message_count: u64,
    pub ended_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_roundtrip() {
        for status in [
            SessionStatus::Pending,
            SessionStatus::Active,
            SessionStatus::Paused,
            SessionStatus::Ended,
        ] {
            let s = status.to_string();
            let parsed: SessionStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_end_reason_roundtrip() {
        for reason in [
            EndReason::CustomerEnded,
            EndReason::ProviderEnded,
            EndReason::BalanceExhausted,
            EndReason::Timeout,
        ] {
            let s = reason.to_string();
            let parsed: EndReason = s.parse().unwrap();
            assert_eq!(reason, parsed);
        }
    }

    #[test]
    fn test_session_status_serde() {
        let json = serde_json::to_string(&SessionStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
        let parsed: SessionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SessionStatus::Paused);
    }

    #[test]
    fn test_new_session_is_pending() {
        let session = ConsultationSession::new(Uuid::now_v7(), Uuid::now_v7(), 1500);
        assert_eq!(session.status, SessionStatus::Pending);
        assert!(session.started_at.is_none());
        assert!(session.is_live());
        assert_eq!(session.billed_seconds, 0);
    }

    #[test]
    fn test_total_cost_whole_minutes() {
        let mut session = ConsultationSession::new(Uuid::now_v7(), Uuid::now_v7(), 1500);
        session.billed_seconds = 180;
        assert_eq!(session.total_cost(), 4500);
    }

    #[test]
    fn test_invalid_status_rejected() {
        assert!("cancelled".parse::<SessionStatus>().is_err());
        assert!("refunded".parse::<EndReason>().is_err());
    }
}
