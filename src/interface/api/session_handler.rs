//! Session control handlers (UI triggers)

use super::dto::{ApiResponse, SessionResponse};
use crate::application::ConnectionLifecycle;
use crate::domain::shared::error::SessionError;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{error, info};

/// Shared state for the session routes
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ConnectionLifecycle>,
}

type SessionReply = (StatusCode, Json<ApiResponse<SessionResponse>>);

fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::InvalidStateTransition(_) => StatusCode::CONFLICT,
        SessionError::MediaAcquisition(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Negotiation(_) => StatusCode::BAD_GATEWAY,
        SessionError::Connection(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(err: SessionError) -> SessionReply {
    (status_for(&err), Json(ApiResponse::error(err.to_string())))
}

/// Health check
pub async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("OK"))
}

/// Current session status
pub async fn get_session(State(state): State<AppState>) -> Json<ApiResponse<SessionResponse>> {
    let snapshot = state.lifecycle.snapshot().await;
    Json(ApiResponse::success(snapshot.into()))
}

/// Start a session and negotiate it
pub async fn start_session(State(state): State<AppState>) -> SessionReply {
    info!("API: Starting session");

    match state.lifecycle.start().await {
        Ok(snapshot) => (StatusCode::OK, Json(ApiResponse::success(snapshot.into()))),
        Err(e) => {
            error!("Failed to start session: {}", e);
            failure(e)
        }
    }
}

/// Stop the active session; teardown completes after the grace delay
pub async fn stop_session(State(state): State<AppState>) -> SessionReply {
    info!("API: Stopping session");

    match state.lifecycle.stop().await {
        Ok(()) => {
            let snapshot = state.lifecycle.snapshot().await;
            (StatusCode::OK, Json(ApiResponse::success(snapshot.into())))
        }
        Err(e) => {
            error!("Failed to stop session: {}", e);
            failure(e)
        }
    }
}
