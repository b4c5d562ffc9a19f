//! Wallet HTTP handlers.
//!
//! Endpoints:
//! - GET  /api/v1/wallet       - Current balance
//! - POST /api/v1/wallet/topup - Credit the caller's wallet

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use samvad_core::ledger::Ledger;
use samvad_types::error::LedgerError;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body for a wallet top-up.
#[derive(Debug, Deserialize)]
pub struct TopupRequest {
    /// Amount in minor currency units.
    pub amount: i64,
}

/// GET /api/v1/wallet - Current balance (0 before any top-up).
pub async fn get_wallet(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let balance = match state.ledger.balance(&identity.user_id).await {
        Ok(balance) => balance,
        // An account that never topped up simply has nothing yet.
        Err(LedgerError::NoWallet) => 0,
        Err(err) => return Err(err.into()),
    };

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({"balance": balance}),
        request_id,
        elapsed,
    )))
}

/// POST /api/v1/wallet/topup - Credit the caller's wallet.
pub async fn topup_wallet(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(body): Json<TopupRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.amount <= 0 {
        return Err(AppError::Validation(
            "Top-up amount must be positive".to_string(),
        ));
    }

    let balance = state.ledger.credit(&identity.user_id, body.amount).await?;
    tracing::info!(user_id = %identity.user_id, amount = body.amount, balance, "wallet credited");

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({"balance": balance}),
        request_id,
        elapsed,
    )))
}
