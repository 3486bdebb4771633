use super::state::AppState;
use crate::conversation::ConversationTurn;
use crate::error::AssistantError;
use crate::session::SessionStatus;
use crate::tools::{Coordinates, Page};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StopSessionRequest {
    /// Persist and clear the conversation (exit-type stop)
    #[serde(default)]
    pub save_history: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// False when the text was blank or no session was open
    pub sent: bool,
}

#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    pub page: Option<Page>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn status_for(err: &AssistantError) -> StatusCode {
    match err {
        AssistantError::Permission(_) => StatusCode::FORBIDDEN,
        AssistantError::Credential(_) => StatusCode::UNAUTHORIZED,
        AssistantError::Transport(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /assistant/start
/// Open a session; the response carries the resulting status
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start requested over HTTP");

    if state.controller.user_id().await.is_none() {
        return error_response(StatusCode::CONFLICT, "No user signed in");
    }

    if let Err(e) = state.controller.start().await {
        error!("Failed to start session: {}", e);
        return error_response(status_for(&e), format!("Failed to start session: {}", e));
    }

    let status: SessionStatus = state.controller.status().await;
    (StatusCode::OK, Json(status)).into_response()
}

/// POST /assistant/stop
pub async fn stop_session(
    State(state): State<AppState>,
    body: Option<Json<StopSessionRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    info!("Stop requested over HTTP (save_history={})", req.save_history);

    state.controller.stop(req.save_history).await;
    (StatusCode::OK, Json(state.controller.status().await))
}

/// POST /assistant/message
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> impl IntoResponse {
    match state.controller.send_text_message(&req.text).await {
        Ok(sent) => (StatusCode::OK, Json(SendMessageResponse { sent })).into_response(),
        Err(e) => {
            error!("Failed to send message: {}", e);
            error_response(status_for(&e), format!("Failed to send message: {}", e))
        }
    }
}

/// POST /assistant/location
pub async fn update_location(
    State(state): State<AppState>,
    Json(coordinates): Json<Coordinates>,
) -> impl IntoResponse {
    state.location.update(Some(coordinates));
    StatusCode::NO_CONTENT
}

/// POST /assistant/credential/reselect
pub async fn reselect_credential(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.reselect_credential().await {
        Ok(()) => (StatusCode::OK, Json(state.controller.status().await)).into_response(),
        Err(e) => {
            error!("Credential reselection failed: {}", e);
            error_response(status_for(&e), e.to_string())
        }
    }
}

/// GET /assistant/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.status().await))
}

/// GET /assistant/conversation
pub async fn get_conversation(State(state): State<AppState>) -> impl IntoResponse {
    let turns: Vec<ConversationTurn> = state.controller.conversation().await;
    (StatusCode::OK, Json(turns))
}

/// GET /assistant/navigation
pub async fn get_navigation(State(state): State<AppState>) -> impl IntoResponse {
    Json(NavigationResponse {
        page: state.navigator.last_page(),
    })
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
