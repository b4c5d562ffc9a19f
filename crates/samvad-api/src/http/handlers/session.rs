//! Consultation session HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions               - Start a consultation (customer)
//! - GET  /api/v1/sessions               - List the caller's consultations
//! - GET  /api/v1/sessions/{id}          - Get one consultation
//! - GET  /api/v1/sessions/{id}/messages - Chat history
//! - POST /api/v1/sessions/{id}/end      - Explicitly end a consultation

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use samvad_core::catalogue::RateCatalogue;
use samvad_core::repository::{MessageRepository, SessionRepository};
use samvad_core::session::command::SessionCommand;
use samvad_types::connection::PartyRole;
use samvad_types::error::SessionError;
use samvad_types::message::ChatMessage;
use samvad_types::session::{ConsultationSession, SessionStatus};

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body for starting a consultation.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub provider_id: Uuid,
}

/// Query parameters for listings.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

/// Load a session and require the caller to be one of its parties.
async fn load_for_participant(
    state: &AppState,
    session_id: &Uuid,
    user_id: &Uuid,
) -> Result<(ConsultationSession, PartyRole), AppError> {
    let session = state
        .sessions
        .get(session_id)
        .await?
        .ok_or(AppError::Session(SessionError::NotFound))?;

    let role = if session.customer_id == *user_id {
        PartyRole::Customer
    } else if session.provider_id == *user_id {
        PartyRole::Provider
    } else {
        return Err(AppError::Forbidden(
            "Not a participant of this consultation".to_string(),
        ));
    };
    Ok((session, role))
}

/// POST /api/v1/sessions - Start a consultation with a provider.
///
/// The caller becomes the customer; the rate is resolved from the
/// provider's catalogue profile and pinned on the session.
pub async fn create_session(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(body): Json<StartSessionRequest>,
) -> Result<Json<ApiResponse<ConsultationSession>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.provider_id == identity.user_id {
        return Err(AppError::Validation(
            "Cannot open a consultation with yourself".to_string(),
        ));
    }

    let provider = state
        .users
        .get(&body.provider_id)
        .await?
        .ok_or(AppError::Validation("Unknown provider".to_string()))?;
    if provider.role != PartyRole::Provider {
        return Err(AppError::Validation(
            "Target user is not a provider".to_string(),
        ));
    }

    let rate = state.catalogue.chat_rate(&body.provider_id).await?;

    let session = ConsultationSession::new(identity.user_id, body.provider_id, rate);
    state.sessions.create(&session).await?;

    tracing::info!(
        session_id = %session.id,
        customer_id = %identity.user_id,
        provider_id = %body.provider_id,
        rate,
        "consultation created"
    );

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(session, request_id, elapsed)))
}

/// GET /api/v1/sessions - List the caller's consultations.
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<ConsultationSession>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sessions = state
        .sessions
        .list_for_user(&identity.user_id, query.limit, query.offset)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(sessions, request_id, elapsed)))
}

/// GET /api/v1/sessions/{id} - Get a consultation (participants only).
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<ConsultationSession>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let (session, _) = load_for_participant(&state, &sid, &identity.user_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(session, request_id, elapsed)))
}

/// GET /api/v1/sessions/{id}/messages - Chat history in sequence order.
pub async fn get_messages(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(session_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    load_for_participant(&state, &sid, &identity.user_id).await?;

    let messages = state.messages.list(&sid, query.limit, query.offset).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(messages, request_id, elapsed)))
}

/// POST /api/v1/sessions/{id}/end - Explicitly end a consultation.
///
/// Routed through the session actor so the end cannot race a billing
/// tick. Works from `pending` too (cancelling a never-attached
/// consultation).
pub async fn end_session(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sid = parse_uuid(&session_id)?;
    let (session, role) = load_for_participant(&state, &sid, &identity.user_id).await?;

    if session.status == SessionStatus::Ended {
        return Err(AppError::Session(SessionError::Ended));
    }

    let handle = state.registry.handle(&sid).await?;
    handle.send(SessionCommand::EndSession { role }).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({"ending": true, "session_id": session_id}),
        request_id,
        elapsed,
    )))
}
