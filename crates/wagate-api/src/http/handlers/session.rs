//! Session lifecycle HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/sessions                 - List all sessions
//! - GET    /api/sessions/{name}          - Get one session
//! - POST   /api/sessions/start           - Start (or create and start)
//! - POST   /api/sessions/stop            - Stop (idempotent)
//! - POST   /api/sessions/restart         - Restart under one lock
//! - DELETE /api/sessions/{name}          - Remove a terminal session
//! - GET    /api/sessions/{name}/auth/qr  - Pending auth code, if any

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use wagate_types::session::{
    AuthCodeResponse, RestartSessionRequest, SessionInfo, StartSessionRequest, StopSessionRequest,
};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Reject names that would collide with routing or log injection.
fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() || name.len() > 64 {
        return Err(AppError::Validation(
            "Session name must be 1-64 characters".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "Session name may only contain alphanumerics, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/sessions - List all registered sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<SessionInfo>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let sessions = state.manager.list_sessions();

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(sessions, request_id, elapsed)))
}

/// GET /api/sessions/{name} - Get a single session snapshot.
pub async fn get_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let info = state.manager.session_info(&name)?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(info, request_id, elapsed)))
}

/// POST /api/sessions/start - Start (or get-or-create and start) a session.
pub async fn start_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<StartSessionRequest>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    validate_name(&body.name)?;
    let info = state
        .manager
        .start(&body.name, body.config.unwrap_or_default())
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(info, request_id, elapsed)))
}

/// POST /api/sessions/stop - Stop a session. Unknown names are a no-op.
pub async fn stop_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<StopSessionRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.manager.stop(&body.name).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "name": body.name, "stopped": true }),
        request_id,
        elapsed,
    )))
}

/// POST /api/sessions/restart - Stop then start atomically.
pub async fn restart_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<RestartSessionRequest>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    validate_name(&body.name)?;
    let info = state
        .manager
        .restart(&body.name, body.config.unwrap_or_default())
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(info, request_id, elapsed)))
}

/// DELETE /api/sessions/{name} - Remove a stopped or failed session.
pub async fn delete_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.manager.remove(&name).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "name": name, "removed": true }),
        request_id,
        elapsed,
    )))
}

/// GET /api/sessions/{name}/auth/qr - Pending auth code for scan login.
pub async fn get_auth_code(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<AuthCodeResponse>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session = state.manager.get_session(&name)?;
    let response = AuthCodeResponse {
        status: session.status(),
        code: session.auth_code(),
    };

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(response, request_id, elapsed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_accepts_reasonable_names() {
        validate_name("alice").unwrap();
        validate_name("tenant-42_prod").unwrap();
    }

    #[test]
    fn test_validate_name_rejects_bad_input() {
        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("path/../traversal").is_err());
        assert!(validate_name(&"x".repeat(65)).is_err());
    }
}
