//! WebSocket gateway for live consultation sessions.
//!
//! `GET /ws/sessions/{id}?token=<token>` upgrades to a WebSocket, resolves
//! the token to a party identity, verifies the identity is the customer
//! or provider of that specific session, attaches through the session
//! registry, and then pumps frames both ways:
//!
//! - **Outbound:** the session actor pushes [`ServerFrame`]s into this
//!   connection's bounded queue; the pump serializes them to the socket.
//! - **Inbound:** text frames are parsed as [`ClientFrame`]s and
//!   translated into [`SessionCommand`]s for the actor.
//!
//! A failed authentication or authorization closes the socket without
//! ever attaching -- the session never learns the connection existed.
//! Socket close, socket error, or a closed outbound queue (superseded by
//! a reconnect, force-detached, or session ended) all funnel into the
//! detach path.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use samvad_core::auth::Auth;
use samvad_core::repository::SessionRepository;
use samvad_core::session::command::SessionCommand;
use samvad_types::connection::PartyRole;
use samvad_types::error::SessionError;
use samvad_types::frame::{ClientFrame, ErrorCode, ServerFrame};
use samvad_types::session::EndReason;

use crate::state::AppState;

/// Query parameters on the WebSocket URL.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// Upgrade an HTTP request to a WebSocket connection for a session.
///
/// This is mounted at `/ws/sessions/{id}` in the router.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, session_id, query.token))
}

/// Core WebSocket connection handler.
async fn handle_ws_connection(socket: WebSocket, state: AppState, session_id: String, token: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Authenticate and authorize before anything touches the session.
    let (session_id, role) = match authorize(&state, &session_id, &token).await {
        Ok(ok) => ok,
        Err(frame) => {
            let _ = send_frame(&mut ws_sender, &frame).await;
            let _ = ws_sender.close().await;
            return;
        }
    };

    // Attach through the registry; the actor decides the lifecycle
    // outcome (activation, resume, or rejection).
    let connection_id = Uuid::now_v7();
    let (outbound_tx, mut outbound_rx) =
        tokio::sync::mpsc::channel::<ServerFrame>(state.policy.outbound_buffer);

    let handle = match state.registry.handle(&session_id).await {
        Ok(handle) => handle,
        Err(err) => {
            let _ = send_frame(&mut ws_sender, &rejection_frame(&err)).await;
            let _ = ws_sender.close().await;
            return;
        }
    };
    if let Err(err) = handle.attach(role, connection_id, outbound_tx).await {
        let _ = send_frame(&mut ws_sender, &rejection_frame(&err)).await;
        let _ = ws_sender.close().await;
        return;
    }

    debug!(%session_id, %role, %connection_id, "websocket attached");

    loop {
        tokio::select! {
            // --- Branch 1: frames from the session actor to the socket ---
            frame = outbound_rx.recv() => {
                match frame {
                    Some(frame) => {
                        let terminal = matches!(frame, ServerFrame::SessionEnded { .. });
                        if !send_frame(&mut ws_sender, &frame).await {
                            break;
                        }
                        if terminal {
                            // Contract: socket closes right after session_ended.
                            break;
                        }
                    }
                    // Superseded by a reconnect, force-detached, or the
                    // session ended and cleared the roster.
                    None => break,
                }
            }

            // --- Branch 2: frames from the client to the session actor ---
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => {
                                let cmd = command_for(frame, role, connection_id);
                                if handle.send(cmd).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                warn!(%session_id, error = %err, "malformed frame ignored");
                                let _ = send_frame(&mut ws_sender, &ServerFrame::Error {
                                    code: ErrorCode::MalformedFrame,
                                    message: "unparseable frame".to_string(),
                                }).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        debug!(%session_id, error = %err, "websocket receive error");
                        break;
                    }
                    // Ignore binary, ping, pong protocol frames (handled by axum/tungstenite)
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Idempotent: the actor ignores detaches for unknown connections.
    let _ = handle
        .send(SessionCommand::Detach { connection_id })
        .await;
    let _ = ws_sender.close().await;
    debug!(%session_id, %connection_id, "websocket closed");
}

/// Resolve token -> identity and identity -> role within the session.
async fn authorize(
    state: &AppState,
    session_id: &str,
    token: &str,
) -> Result<(Uuid, PartyRole), ServerFrame> {
    let session_id = session_id.parse::<Uuid>().map_err(|_| ServerFrame::Error {
        code: ErrorCode::AuthorizationFailure,
        message: "invalid session id".to_string(),
    })?;

    let identity = state
        .auth
        .resolve_identity(token)
        .await
        .map_err(|_| ServerFrame::Error {
            code: ErrorCode::AuthenticationFailure,
            message: "invalid or expired token".to_string(),
        })?;

    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok()
        .flatten()
        .ok_or(ServerFrame::Error {
            code: ErrorCode::AuthorizationFailure,
            message: "unknown session".to_string(),
        })?;

    let role = if session.customer_id == identity.user_id {
        PartyRole::Customer
    } else if session.provider_id == identity.user_id {
        PartyRole::Provider
    } else {
        return Err(ServerFrame::Error {
            code: ErrorCode::AuthorizationFailure,
            message: "not a participant of this session".to_string(),
        });
    };

    Ok((session_id, role))
}

/// Translate an inbound frame into the actor command vocabulary.
fn command_for(frame: ClientFrame, role: PartyRole, connection_id: Uuid) -> SessionCommand {
    match frame {
        ClientFrame::ChatMessage {
            body,
            idempotency_token,
        } => SessionCommand::Submit {
            connection_id,
            role,
            body,
            idempotency_token,
        },
        ClientFrame::Typing { is_typing } => SessionCommand::Typing {
            connection_id,
            role,
            is_typing,
        },
        ClientFrame::Heartbeat => SessionCommand::Heartbeat { connection_id },
        ClientFrame::EndSession => SessionCommand::EndSession { role },
    }
}

/// Frame sent when the registry or actor refuses an attach.
fn rejection_frame(err: &SessionError) -> ServerFrame {
    match err {
        SessionError::BalanceExhausted => ServerFrame::SessionEnded {
            reason: EndReason::BalanceExhausted,
        },
        other => ServerFrame::Error {
            code: ErrorCode::InvalidSessionState,
            message: other.to_string(),
        },
    }
}

/// Serialize and send one frame. Returns false once the socket is gone.
async fn send_frame(ws_sender: &mut SplitSink<WebSocket, Message>, frame: &ServerFrame) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => ws_sender.send(Message::Text(json.into())).await.is_ok(),
        Err(err) => {
            warn!(error = %err, "failed to serialize server frame");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_frame_maps_to_submit() {
        let conn = Uuid::now_v7();
        let cmd = command_for(
            ClientFrame::ChatMessage {
                body: "hello".to_string(),
                idempotency_token: "a1".to_string(),
            },
            PartyRole::Customer,
            conn,
        );
        match cmd {
            SessionCommand::Submit {
                connection_id,
                role,
                body,
                idempotency_token,
            } => {
                assert_eq!(connection_id, conn);
                assert_eq!(role, PartyRole::Customer);
                assert_eq!(body, "hello");
                assert_eq!(idempotency_token, "a1");
            }
            other => panic!("expected Submit, got {other:?}"),
        }
    }

    #[test]
    fn test_end_frame_carries_role() {
        let cmd = command_for(ClientFrame::EndSession, PartyRole::Provider, Uuid::now_v7());
        assert!(matches!(
            cmd,
            SessionCommand::EndSession {
                role: PartyRole::Provider
            }
        ));
    }

    #[test]
    fn test_balance_rejection_is_terminal_frame() {
        let frame = rejection_frame(&SessionError::BalanceExhausted);
        assert!(matches!(
            frame,
            ServerFrame::SessionEnded {
                reason: EndReason::BalanceExhausted
            }
        ));
    }

    #[test]
    fn test_other_rejections_are_error_frames() {
        let frame = rejection_frame(&SessionError::Ended);
        assert!(matches!(
            frame,
            ServerFrame::Error {
                code: ErrorCode::InvalidSessionState,
                ..
            }
        ));
    }
}
