//! Error taxonomy for the session orchestration layer.

use thiserror::Error;

use crate::session::SessionStatus;

/// Failures raised by an engine handle.
///
/// Retryable errors are transient network blips: the session stays `WORKING`
/// and the caller may retry the operation. Fatal errors mean the connection
/// is permanently lost (auth revoked, hard disconnect) and drop the session
/// to `FAILED`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("retryable engine failure: {0}")]
    Retryable(String),

    #[error("fatal engine failure: {0}")]
    Fatal(String),
}

impl EngineError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_))
    }
}

/// Errors surfaced by the session manager and session operations.
///
/// Every variant carries enough structure (kind + current status) for the
/// dispatch surface to map it to a stable HTTP status and for callers to
/// decide on retry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The name was never started or has been removed.
    #[error("session '{0}' not found")]
    NotFound(String),

    /// The session exists but is not `WORKING`.
    #[error("session '{name}' is not working, status is {status}")]
    NotReady {
        name: String,
        status: SessionStatus,
    },

    /// The requested transition is illegal from the current state,
    /// e.g. removing a session with a live engine handle.
    #[error("session '{name}' is {status}: {reason}")]
    InvalidState {
        name: String,
        status: SessionStatus,
        reason: String,
    },

    /// An engine failure propagated verbatim from the handle.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_display_carries_status() {
        let err = SessionError::NotReady {
            name: "alice".to_string(),
            status: SessionStatus::Starting,
        };
        assert_eq!(
            err.to_string(),
            "session 'alice' is not working, status is STARTING"
        );
    }

    #[test]
    fn test_engine_error_classification() {
        assert!(EngineError::Fatal("auth revoked".to_string()).is_fatal());
        assert!(!EngineError::Retryable("timeout".to_string()).is_fatal());
    }

    #[test]
    fn test_engine_error_converts_transparently() {
        let err: SessionError = EngineError::Retryable("blip".to_string()).into();
        assert_eq!(err.to_string(), "retryable engine failure: blip");
    }
}
