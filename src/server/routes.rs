//! HTTP route handlers for the `FeelMate` support API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::protocol::{
    ChatHistoryResponse, DASHBOARD_STATS_PATH, DashboardStats, HISTORY_PATH, SEND_MESSAGE_PATH,
    SESSION_STATUS_PATH, START_SESSION_PATH, SendMessageRequest, SendMessageResponse,
    SessionStatus, StartSessionRequest, StartSessionResponse,
};
use crate::support::SupportError;

use super::state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(SEND_MESSAGE_PATH, post(send_message))
        .route(&format!("{HISTORY_PATH}/{{session_id}}"), get(chat_history))
        .route(
            &format!("{SESSION_STATUS_PATH}/{{session_id}}"),
            get(session_status),
        )
        .route(START_SESSION_PATH, post(start_session))
        .route(DASHBOARD_STATS_PATH, get(dashboard_stats))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "feelmate",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn error_response(err: SupportError) -> (StatusCode, String) {
    match err {
        SupportError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        other => {
            tracing::error!(error = %other, "Support request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Support error: {other}"))
        }
    }
}

/// Classify a user turn and answer it.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<SendMessageResponse> {
    let response = state
        .support
        .handle_message(request)
        .await
        .map_err(error_response)?;

    Ok(Json(response))
}

/// Stored turns of a session, oldest first.
async fn chat_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<ChatHistoryResponse> {
    let history = state
        .support
        .history(session_id)
        .await
        .map_err(error_response)?;

    Ok(Json(history))
}

/// Timeout bookkeeping of a session.
async fn session_status(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionStatus> {
    let status = state
        .support
        .session_status(session_id)
        .await
        .map_err(error_response)?;

    Ok(Json(status))
}

/// Mint a session before the first message. The body is optional.
async fn start_session(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<StartSessionResponse> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StartSessionRequest::default()
    } else {
        serde_json::from_slice::<StartSessionRequest>(&body)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid body: {e}")))?
    };

    let session_id = state
        .support
        .start_session(request.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(StartSessionResponse { session_id }))
}

/// Aggregate counters over all stored turns.
async fn dashboard_stats(State(state): State<Arc<AppState>>) -> ApiResult<DashboardStats> {
    let stats = state
        .support
        .dashboard_stats()
        .await
        .map_err(error_response)?;

    Ok(Json(stats))
}
