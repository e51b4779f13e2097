//! Session and dice API endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::warn;

use super::{AppState, ErrorResponse};
use crate::dice::{DieId, DieKind, RollRecord, SessionSnapshot};
use crate::sessions::{DiceSession, SessionError, SessionId};

/// Build session router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(end_session))
        .route("/sessions/{id}/history", get(history))
        .route("/sessions/{id}/roll", post(roll_all))
        .route("/sessions/{id}/dice", post(add_die))
        .route("/sessions/{id}/dice/reset", post(reset_dice))
        .route("/sessions/{id}/dice/{die_id}", delete(remove_die))
        .route("/sessions/{id}/dice/{die_id}/roll", post(roll_one))
}

/// Session state as seen by clients
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub roll_delay_ms: u64,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

impl SessionView {
    pub(super) fn of(session: &DiceSession) -> Self {
        Self {
            id: session.id(),
            created_at: session.created_at(),
            roll_delay_ms: session.roll_delay().as_millis() as u64,
            snapshot: session.snapshot(),
        }
    }
}

/// Result of a mutating call
///
/// Guarded no-ops (removing the last die, adding to a full table, rolling a
/// rolling die) come back with `applied: false`.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub die_id: Option<DieId>,
    /// Committed records, only filled when the caller waited for the roll
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RollRecord>,
    pub session: SessionView,
}

impl MutationResponse {
    fn new(applied: bool, session: &DiceSession) -> Self {
        Self {
            applied,
            die_id: None,
            records: Vec::new(),
            session: SessionView::of(session),
        }
    }
}

/// Add die request
#[derive(Debug, Deserialize)]
pub struct AddDieRequest {
    pub kind: String,
}

/// Roll query parameters
#[derive(Debug, Default, Deserialize)]
pub struct RollQuery {
    /// Wait for the roll to resolve before responding
    #[serde(default)]
    pub wait: bool,
}

async fn create_session(State(state): State<AppState>) -> Result<Response, SessionError> {
    let session = state.sessions.create().await?;
    Ok((StatusCode::CREATED, Json(SessionView::of(&session))).into_response())
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionView>, SessionError> {
    let session = state.sessions.get(id).await?;
    Ok(Json(SessionView::of(&session)))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, SessionError> {
    state.sessions.end(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn history(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<Vec<RollRecord>>, SessionError> {
    let session = state.sessions.get(id).await?;
    Ok(Json(session.history()))
}

async fn add_die(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    payload: Result<Json<AddDieRequest>, JsonRejection>,
) -> Result<Response, SessionError> {
    let session = state.sessions.get(id).await?;

    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return Ok(ErrorResponse::with_status(
                rejection.status(),
                rejection.body_text(),
            ))
        }
    };
    let kind: DieKind = match req.kind.parse() {
        Ok(kind) => kind,
        Err(e) => return Ok(ErrorResponse::with_status(StatusCode::BAD_REQUEST, e)),
    };

    let Some(die_id) = session.add_die(kind) else {
        return Ok(Json(MutationResponse::new(false, &session)).into_response());
    };
    let mut resp = MutationResponse::new(true, &session);
    resp.die_id = Some(die_id);
    Ok((StatusCode::CREATED, Json(resp)).into_response())
}

async fn remove_die(
    State(state): State<AppState>,
    Path((id, die_id)): Path<(SessionId, DieId)>,
) -> Result<Json<MutationResponse>, SessionError> {
    let session = state.sessions.get(id).await?;
    let removed = session.remove_die(die_id);
    Ok(Json(MutationResponse::new(removed, &session)))
}

async fn reset_dice(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<MutationResponse>, SessionError> {
    let session = state.sessions.get(id).await?;
    session.reset_to_default();
    Ok(Json(MutationResponse::new(true, &session)))
}

async fn roll_one(
    State(state): State<AppState>,
    Path((id, die_id)): Path<(SessionId, DieId)>,
    Query(query): Query<RollQuery>,
) -> Result<Json<MutationResponse>, SessionError> {
    let session = state.sessions.get(id).await?;
    let handle = session.roll_one(die_id);
    Ok(Json(finish_roll(&session, handle, query.wait).await))
}

async fn roll_all(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Query(query): Query<RollQuery>,
) -> Result<Json<MutationResponse>, SessionError> {
    let session = state.sessions.get(id).await?;
    let handle = session.roll_all();
    Ok(Json(finish_roll(&session, handle, query.wait).await))
}

/// Build the response for a roll, optionally waiting for it to commit
async fn finish_roll(
    session: &Arc<DiceSession>,
    handle: Option<JoinHandle<Vec<RollRecord>>>,
    wait: bool,
) -> MutationResponse {
    let Some(handle) = handle else {
        return MutationResponse::new(false, session);
    };

    let records = if wait {
        match handle.await {
            Ok(records) => records,
            Err(e) => {
                warn!("Roll task for session {} failed: {}", session.id(), e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let mut resp = MutationResponse::new(true, session);
    resp.records = records;
    resp
}
