//! Application error type mapping to HTTP status codes and envelope format.
//!
//! Session error mapping:
//! - `NotFound`      -> 404, the name has never been started
//! - `NotReady`      -> 422, the session exists but is not `WORKING`
//! - `InvalidState`  -> 409, the operation conflicts with the current state
//! - `Engine` retryable -> 502, the backend hiccupped; the client may retry
//! - `Engine` fatal  -> 500, the session is failing over to `FAILED`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use wagate_types::error::{EngineError, SessionError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session lifecycle or dispatch errors.
    Session(SessionError),
    /// Authentication failure.
    Unauthorized(String),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl AppError {
    fn status_code_message(&self) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
        match self {
            AppError::Session(SessionError::NotFound(name)) => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
                format!("Session '{name}' not found"),
                None,
            ),
            AppError::Session(SessionError::NotReady { name, status }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "SESSION_NOT_READY",
                format!("Session '{name}' is not working"),
                Some(json!({ "status": status })),
            ),
            AppError::Session(SessionError::InvalidState { name, status, reason }) => (
                StatusCode::CONFLICT,
                "INVALID_SESSION_STATE",
                format!("Session '{name}': {reason}"),
                Some(json!({ "status": status })),
            ),
            AppError::Session(SessionError::Engine(EngineError::Retryable(msg))) => (
                StatusCode::BAD_GATEWAY,
                "ENGINE_UNAVAILABLE",
                msg.clone(),
                None,
            ),
            AppError::Session(SessionError::Engine(EngineError::Fatal(msg))) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ENGINE_FAILURE",
                msg.clone(),
                None,
            ),
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
                None,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.status_code_message();

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
                "details": details,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_types::session::SessionStatus;

    fn status_of(err: AppError) -> StatusCode {
        err.status_code_message().0
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = AppError::Session(SessionError::NotFound("alice".to_string()));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_not_ready_maps_to_422_with_status_details() {
        let err = AppError::Session(SessionError::NotReady {
            name: "alice".to_string(),
            status: SessionStatus::Starting,
        });
        let (status, code, _, details) = err.status_code_message();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "SESSION_NOT_READY");
        assert_eq!(details.unwrap()["status"], "STARTING");
    }

    #[test]
    fn test_invalid_state_maps_to_409() {
        let err = AppError::Session(SessionError::InvalidState {
            name: "alice".to_string(),
            status: SessionStatus::Working,
            reason: "session must be stopped or failed before removal".to_string(),
        });
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_engine_errors_split_by_classification() {
        let retryable = AppError::Session(SessionError::Engine(EngineError::Retryable(
            "daemon timeout".to_string(),
        )));
        assert_eq!(status_of(retryable), StatusCode::BAD_GATEWAY);

        let fatal = AppError::Session(SessionError::Engine(EngineError::Fatal(
            "logged out".to_string(),
        )));
        assert_eq!(status_of(fatal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unauthorized_maps_to_401() {
        assert_eq!(
            status_of(AppError::Unauthorized("bad key".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }
}
