//! Status-broadcast ("story") HTTP handlers.
//!
//! Endpoints (session in path):
//! - POST /api/{session}/status/text
//! - POST /api/{session}/status/image
//! - POST /api/{session}/status/voice
//! - POST /api/{session}/status/video
//! - POST /api/{session}/status/delete

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use wagate_types::status::{
    DeleteStatusRequest, ImageStatus, SentStatus, TextStatus, VideoStatus, VoiceStatus,
};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/{session}/status/text - Broadcast a text status.
pub async fn send_text_status(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session): Path<String>,
    Json(body): Json<TextStatus>,
) -> Result<Json<ApiResponse<SentStatus>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.text.is_empty() {
        return Err(AppError::Validation("Status text must not be empty".to_string()));
    }
    let session = state.manager.get_working_session(&session)?;
    let sent = session.send_text_status(&body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(sent, request_id, elapsed)))
}

/// POST /api/{session}/status/image - Broadcast an image status.
pub async fn send_image_status(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session): Path<String>,
    Json(body): Json<ImageStatus>,
) -> Result<Json<ApiResponse<SentStatus>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&session)?;
    let sent = session.send_image_status(&body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(sent, request_id, elapsed)))
}

/// POST /api/{session}/status/voice - Broadcast a voice-note status.
pub async fn send_voice_status(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session): Path<String>,
    Json(body): Json<VoiceStatus>,
) -> Result<Json<ApiResponse<SentStatus>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&session)?;
    let sent = session.send_voice_status(&body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(sent, request_id, elapsed)))
}

/// POST /api/{session}/status/video - Broadcast a video status.
pub async fn send_video_status(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session): Path<String>,
    Json(body): Json<VideoStatus>,
) -> Result<Json<ApiResponse<SentStatus>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&session)?;
    let sent = session.send_video_status(&body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(sent, request_id, elapsed)))
}

/// POST /api/{session}/status/delete - Delete a previously posted status.
pub async fn delete_status(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(session): Path<String>,
    Json(body): Json<DeleteStatusRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_working_session(&session)?;
    session.delete_status(&body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "id": body.id, "deleted": true }),
        request_id,
        elapsed,
    )))
}
