//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use samvad_types::error::{AuthError, LedgerError, RepositoryError, SessionError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session lifecycle errors.
    Session(SessionError),
    /// Identity resolution failures.
    Auth(AuthError),
    /// Wallet ledger errors.
    Ledger(LedgerError),
    /// Storage errors.
    Repository(RepositoryError),
    /// Caller is not a participant of the session.
    Forbidden(String),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl From<LedgerError> for AppError {
    fn from(e: LedgerError) -> Self {
        AppError::Ledger(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Session(SessionError::NotFound) => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", "Session not found".to_string())
            }
            AppError::Session(SessionError::Ended) => {
                (StatusCode::CONFLICT, "SESSION_ENDED", "Session has ended".to_string())
            }
            AppError::Session(SessionError::CustomerBusy) => {
                (StatusCode::CONFLICT, "CUSTOMER_BUSY", "Customer already has a live session".to_string())
            }
            AppError::Session(SessionError::BalanceExhausted) => {
                (StatusCode::PAYMENT_REQUIRED, "BALANCE_EXHAUSTED", "Balance does not cover one minute".to_string())
            }
            AppError::Session(e @ SessionError::InvalidState(_)) => {
                (StatusCode::CONFLICT, "INVALID_SESSION_STATE", e.to_string())
            }
            AppError::Session(SessionError::NotParticipant) => {
                (StatusCode::FORBIDDEN, "NOT_PARTICIPANT", "Not a participant of this session".to_string())
            }
            AppError::Session(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SESSION_ERROR", e.to_string())
            }
            AppError::Auth(AuthError::InvalidToken) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Invalid or expired token. Provide a valid token via 'Authorization: Bearer <token>'.".to_string())
            }
            AppError::Auth(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_ERROR", e.to_string())
            }
            AppError::Ledger(LedgerError::Insufficient) => {
                (StatusCode::PAYMENT_REQUIRED, "BALANCE_EXHAUSTED", "Insufficient balance".to_string())
            }
            AppError::Ledger(LedgerError::NoWallet) => {
                (StatusCode::NOT_FOUND, "WALLET_NOT_FOUND", "No wallet for this customer".to_string())
            }
            AppError::Ledger(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "LEDGER_ERROR", e.to_string())
            }
            AppError::Repository(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Entity not found".to_string())
            }
            AppError::Repository(RepositoryError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Repository(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = json!({
            "data": null,
            "meta": {
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
