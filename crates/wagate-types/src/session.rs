//! Session lifecycle types and request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineKind;

/// Lifecycle status of a session.
///
/// A session moves `STOPPED -> STARTING -> (SCAN_REQUIRED ->) WORKING`,
/// drops to `FAILED` on fatal engine errors or auth timeout, and passes
/// through `STOPPING` on the way back to `STOPPED`. Operations may only be
/// dispatched while `WORKING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Stopped,
    Starting,
    ScanRequired,
    Working,
    Failed,
    Stopping,
}

impl SessionStatus {
    /// Terminal states: the engine handle is gone and the session may be
    /// removed from the registry or restarted in place.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Stopped | SessionStatus::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Stopped => "STOPPED",
            SessionStatus::Starting => "STARTING",
            SessionStatus::ScanRequired => "SCAN_REQUIRED",
            SessionStatus::Working => "WORKING",
            SessionStatus::Failed => "FAILED",
            SessionStatus::Stopping => "STOPPING",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STOPPED" => Ok(SessionStatus::Stopped),
            "STARTING" => Ok(SessionStatus::Starting),
            "SCAN_REQUIRED" => Ok(SessionStatus::ScanRequired),
            "WORKING" => Ok(SessionStatus::Working),
            "FAILED" => Ok(SessionStatus::Failed),
            "STOPPING" => Ok(SessionStatus::Stopping),
            other => Err(format!("unknown session status: '{other}'")),
        }
    }
}

/// Per-session configuration supplied on start/restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Which engine backs this session. Falls back to the gateway default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineKind>,
    /// Outbound proxy URL for the engine's daemon traffic. Ignored by the
    /// in-memory simulated engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Log every engine operation this session dispatches.
    #[serde(default)]
    pub debug: bool,
}

/// Diagnostic snapshot of a session, returned by the sessions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub name: String,
    pub status: SessionStatus,
    pub config: SessionConfig,
    /// Last failure detail, cleared on successful (re)start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}

/// Body for `POST /api/sessions/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub name: String,
    #[serde(default)]
    pub config: Option<SessionConfig>,
}

/// Body for `POST /api/sessions/stop`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSessionRequest {
    pub name: String,
}

/// Body for `POST /api/sessions/restart`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartSessionRequest {
    pub name: String,
    #[serde(default)]
    pub config: Option<SessionConfig>,
}

/// Response for `GET /api/sessions/{name}/auth/qr`.
///
/// `code` is the payload the tenant must scan to complete interactive
/// authentication; only present while the session is `SCAN_REQUIRED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCodeResponse {
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            SessionStatus::Stopped,
            SessionStatus::Starting,
            SessionStatus::ScanRequired,
            SessionStatus::Working,
            SessionStatus::Failed,
            SessionStatus::Stopping,
        ] {
            let parsed: SessionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&SessionStatus::ScanRequired).unwrap();
        assert_eq!(json, "\"SCAN_REQUIRED\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionStatus::Stopped.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Working.is_terminal());
        assert!(!SessionStatus::Stopping.is_terminal());
    }

    #[test]
    fn test_session_config_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert!(config.engine.is_none());
        assert!(config.proxy.is_none());
        assert!(!config.debug);
    }
}
