//! HTTP request handlers

use super::types::{ErrorResponse, ResetRequest, ResetResponse, SessionListResponse};
use super::AppState;
use crate::session::{SessionRecord, StoreError};
use crate::webhook::{WebhookRequest, WebhookResponse};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Fulfillment webhook
        .route("/webhook", post(webhook))
        .route("/api/dialogflow/webhook", post(webhook))
        // Session inspection
        .route("/sessions", get(list_sessions))
        .route("/sessions/reset", post(reset_sessions))
        .route("/sessions/:id", get(get_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

/// One conversation turn. Always answers 200: any failure becomes the
/// fixed apology reply.
async fn webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Json<WebhookResponse> {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::error!(error = %rejection, "Unreadable webhook request");
            return Json(WebhookResponse::apology());
        }
    };

    tracing::debug!(
        response_id = ?req.response_id,
        query_text = ?req.query_text(),
        contexts = ?req.context_names(),
        "Webhook request"
    );

    let turn = req.into_turn();
    match state.orchestrator.run_turn(&turn) {
        Ok(outcome) => {
            tracing::info!(
                session_id = %outcome.session_id,
                states = ?outcome.visited,
                "Turn complete"
            );
            Json(WebhookResponse::build(&outcome))
        }
        Err(e) => {
            tracing::error!(
                session_id = %turn.session_id,
                intent = ?turn.intent_name,
                error = %e,
                "Turn failed"
            );
            Json(WebhookResponse::apology())
        }
    }
}

// ============================================================
// Session inspection
// ============================================================

async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let sessions = state.store().snapshot();
    Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionRecord>, AppError> {
    Ok(Json(state.store().get(&id)?))
}

/// Empty body resets every session; `{"sessionId": ..}` resets one
async fn reset_sessions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ResetResponse>, AppError> {
    let req: ResetRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ResetRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid reset request: {e}")))?
    };

    let response = match req.session_id {
        Some(session_id) => {
            let existed = state.store().reset(&session_id);
            tracing::info!(session_id = %session_id, existed, "Session reset");
            ResetResponse::One {
                session_id,
                existed,
            }
        }
        None => {
            let removed = state.store().reset_all();
            tracing::info!(removed, "All sessions reset");
            ResetResponse::All { removed }
        }
    };
    Ok(Json(response))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("ethics-tutor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::SessionNotFound(_) => AppError::NotFound(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
