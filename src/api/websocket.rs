//! WebSocket handler for live session updates
//!
//! A client attached to a session receives a snapshot, then every session
//! event as it happens. It may also drive the session with commands.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::{AppState, SessionView};
use crate::dice::{DieId, DieKind};
use crate::sessions::{DiceSession, SessionError, SessionEvent, SessionId};

/// Build websocket router
pub fn router() -> Router<AppState> {
    Router::new().route("/sessions/{id}/ws", get(ws_handler))
}

/// Messages sent from server to client
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full state, sent on connect and after falling behind
    #[serde(rename = "snapshot")]
    Snapshot { session: SessionView },
    /// Something changed
    #[serde(rename = "event")]
    Event { event: SessionEvent },
    /// Command was valid but had no effect
    #[serde(rename = "ignored")]
    Ignored { command: String },
    /// Reply to a client ping
    #[serde(rename = "pong")]
    Pong,
    /// Error message
    #[serde(rename = "error")]
    Error { message: String },
}

/// Messages sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "add_die")]
    AddDie { kind: String },
    #[serde(rename = "remove_die")]
    RemoveDie { die_id: DieId },
    #[serde(rename = "reset")]
    Reset,
    #[serde(rename = "roll")]
    Roll { die_id: DieId },
    #[serde(rename = "roll_all")]
    RollAll,
    /// Ping to keep connection alive
    #[serde(rename = "ping")]
    Ping,
}

/// Handle WebSocket upgrade
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Response, SessionError> {
    let session = state.sessions.get(id).await?;
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, session))
        .into_response())
}

/// Handle an individual WebSocket connection
async fn handle_socket(mut socket: WebSocket, session: Arc<DiceSession>) {
    // Subscribe before the snapshot so nothing falls in between
    let mut events = session.subscribe();
    info!("WebSocket attached to session {}", session.id());

    if !send(&mut socket, &snapshot(&session)).await {
        return;
    }

    loop {
        tokio::select! {
            result = events.recv() => {
                match result {
                    Ok(event) => {
                        let ended = matches!(event, SessionEvent::SessionEnded);
                        if !send(&mut socket, &ServerMessage::Event { event }).await {
                            break;
                        }
                        if ended {
                            let _ = socket.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Session {} observer lagged by {} events", session.id(), skipped);
                        if !send(&mut socket, &snapshot(&session)).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => handle_client_message(&session, msg),
                            Err(e) => Some(ServerMessage::Error {
                                message: format!("invalid message: {}", e),
                            }),
                        };
                        if let Some(reply) = reply {
                            if !send(&mut socket, &reply).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket detached from session {}", session.id());
}

/// Apply a client command; returns a direct reply if one is due
///
/// Successful commands need no reply, their effect arrives as events.
fn handle_client_message(session: &Arc<DiceSession>, msg: ClientMessage) -> Option<ServerMessage> {
    debug!("Session {} command: {:?}", session.id(), msg);

    let (applied, command) = match msg {
        ClientMessage::AddDie { kind } => match kind.parse::<DieKind>() {
            Ok(kind) => (session.add_die(kind).is_some(), "add_die"),
            Err(e) => {
                return Some(ServerMessage::Error {
                    message: e.to_string(),
                })
            }
        },
        ClientMessage::RemoveDie { die_id } => (session.remove_die(die_id), "remove_die"),
        ClientMessage::Reset => {
            session.reset_to_default();
            (true, "reset")
        }
        ClientMessage::Roll { die_id } => (session.roll_one(die_id).is_some(), "roll"),
        ClientMessage::RollAll => (session.roll_all().is_some(), "roll_all"),
        ClientMessage::Ping => return Some(ServerMessage::Pong),
    };

    if applied {
        None
    } else {
        Some(ServerMessage::Ignored {
            command: command.to_string(),
        })
    }
}

fn snapshot(session: &DiceSession) -> ServerMessage {
    ServerMessage::Snapshot {
        session: SessionView::of(session),
    }
}

/// Send a message, returning false once the socket is gone
async fn send(socket: &mut WebSocket, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode message: {}", e);
            true
        }
    }
}
