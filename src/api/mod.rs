//! HTTP API module - REST endpoints and WebSocket

mod sessions;
mod websocket;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::sessions::{SessionError, SessionManager};
pub use sessions::{MutationResponse, SessionView};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

/// Build the API router
pub fn router(sessions: Arc<SessionManager>) -> Router {
    let state = AppState { sessions };

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .merge(sessions::router())
        .merge(websocket::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Root endpoint
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        name: "diced",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    name: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        sessions: state.sessions.count().await,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn with_status(status: StatusCode, error: impl ToString) -> Response {
        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Capacity(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        ErrorResponse::with_status(status, self)
    }
}
