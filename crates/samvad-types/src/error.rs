use thiserror::Error;

use crate::session::SessionStatus;

/// Errors related to session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("session is {0}")]
    InvalidState(SessionStatus),

    #[error("session has ended")]
    Ended,

    #[error("customer balance exhausted")]
    BalanceExhausted,

    #[error("customer already has a live session")]
    CustomerBusy,

    #[error("not a participant of this session")]
    NotParticipant,

    #[error("message body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("session processor unavailable")]
    Unavailable,

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors from the wallet ledger collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance")]
    Insufficient,

    #[error("no wallet for customer")]
    NoWallet,

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Errors from identity resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("auth backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors from repository operations (used by trait definitions in samvad-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
