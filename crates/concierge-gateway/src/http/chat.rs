//! The three routes the core exposes to the outside world (§6.1): a single
//! orchestrator turn, a confirm/cancel re-entry for a staged preview, and a
//! tenant-scoped session history read. Auth, registration, and profile CRUD
//! are out of scope (§1) — callers pass `user_id` directly in the request.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use concierge_core::envelope::Envelope;
use concierge_core::{SessionId, StudentProfile, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct OrchestratorRequest {
    pub message: String,
    /// Client-side UI hint (e.g. "chat" vs "voice"); the core does not
    /// branch on it.
    #[serde(default)]
    #[allow(dead_code)]
    pub mode: Option<String>,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmActionRequest {
    pub session_id: String,
    pub confirmed: bool,
    /// The preview fields the client is confirming back, unmodified (or an
    /// `edited_draft` override). The flow-pause store remains the source of
    /// truth for what actually executes (§9 "flow state as data") — this is
    /// accepted for client-side round-tripping, not re-validated here.
    #[serde(default)]
    #[allow(dead_code)]
    pub action_data: Option<Value>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub user_id: String,
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

fn profile_for(user_id: Option<String>) -> StudentProfile {
    let user_id = user_id.unwrap_or_else(|| "anonymous".to_string());
    let email = format!("{user_id}@college.edu");
    StudentProfile {
        user_id: UserId::from(user_id),
        email,
        name: None,
    }
}

/// POST /chat/orchestrator — one student turn through the full pipeline
/// (§4.8), returning the envelope the frontend renders.
pub async fn orchestrator_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrchestratorRequest>,
) -> Result<Json<Envelope>, (StatusCode, Json<ApiError>)> {
    if req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "message cannot be empty".to_string(),
            }),
        ));
    }
    if req.session_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "session_id is required".to_string(),
            }),
        ));
    }

    let session_id = SessionId::from(req.session_id.as_str());
    let profile = profile_for(req.user_id);
    let envelope = state.orchestrator.process_message(&session_id, &profile, &req.message).await;
    Ok(Json(envelope))
}

/// POST /chat/confirm-action — re-enters the orchestrator's ordinary
/// message path with the keyword that carries the same meaning as an
/// explicit confirm/cancel turn (§8 invariant 3: confirmation requires an
/// explicit keyword on the confirming turn).
pub async fn confirm_action_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmActionRequest>,
) -> Result<Json<Envelope>, (StatusCode, Json<ApiError>)> {
    if req.session_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "session_id is required".to_string(),
            }),
        ));
    }

    let session_id = SessionId::from(req.session_id.as_str());
    let profile = profile_for(req.user_id);
    let message = if req.confirmed { "confirm" } else { "cancel" };
    let envelope = state.orchestrator.process_message(&session_id, &profile, message).await;
    Ok(Json(envelope))
}

#[derive(Debug, Serialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
    pub intent: Option<String>,
    pub agent: Option<String>,
    pub created_at: String,
}

/// GET /chat/session/{session_id} — messages filtered to the caller's
/// `user_id` (tenant isolation, §8 invariant 1).
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<SessionMessage>>, (StatusCode, Json<ApiError>)> {
    match state.memory.get_session_history(&session_id, &query.user_id, query.limit) {
        Ok(messages) => Ok(Json(
            messages
                .into_iter()
                .map(|m| SessionMessage {
                    role: m.role.to_string(),
                    content: m.content,
                    intent: m.intent,
                    agent: m.agent,
                    created_at: m.created_at.to_rfc3339(),
                })
                .collect(),
        )),
        Err(e) => {
            warn!(error = %e, "failed to load session history");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: "could not load session history".to_string(),
                }),
            ))
        }
    }
}
