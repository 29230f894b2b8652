//! Presence HTTP handlers.
//!
//! Endpoints (session in path):
//! - POST /api/{session}/presence                       - Set own presence
//! - GET  /api/{session}/presence/{contact}             - Last known presence
//! - POST /api/{session}/presence/{contact}/subscribe   - Watch a contact

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use wagate_types::presence::{PresenceInfo, SetPresenceRequest};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/{session}/presence - Broadcast this session's presence.
pub async fn set_presence(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session): Path<String>,
    Json(body): Json<SetPresenceRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&session)?;
    session.set_presence(&body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "presence": body.presence }),
        request_id,
        elapsed,
    )))
}

/// GET /api/{session}/presence/{contact} - Last known presence of a contact.
pub async fn get_presence(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((session, contact_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<PresenceInfo>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&session)?;
    let info = session.get_presence(&contact_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(info, request_id, elapsed)))
}

/// POST /api/{session}/presence/{contact}/subscribe - Subscribe to updates.
pub async fn subscribe_presence(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((session, contact_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&session)?;
    session.subscribe_presence(&contact_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "contactId": contact_id, "subscribed": true }),
        request_id,
        elapsed,
    )))
}
