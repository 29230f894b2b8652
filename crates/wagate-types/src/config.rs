//! Gateway configuration types.
//!
//! Deserialized from `{data_dir}/config.toml` by the loader in
//! `wagate-engine`; environment variables override individual fields at the
//! binary edge.

use serde::{Deserialize, Serialize};

/// Which engine implementation backs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Deterministic in-memory engine for development and tests.
    Simulated,
    /// External engine daemon driven over HTTP + SSE.
    Remote,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Simulated => write!(f, "simulated"),
            EngineKind::Remote => write!(f, "remote"),
        }
    }
}

impl std::str::FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simulated" => Ok(EngineKind::Simulated),
            "remote" => Ok(EngineKind::Remote),
            other => Err(format!("unknown engine kind: '{other}'")),
        }
    }
}

/// Connection settings for the remote engine daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEngineConfig {
    /// Base URL of the engine daemon, e.g. `http://127.0.0.1:3100`.
    pub base_url: String,
    /// API key forwarded to the daemon, if it requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Gateway-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Default engine for sessions that do not pick one.
    pub engine: EngineKind,
    /// Seconds a session may sit in `SCAN_REQUIRED` before failing.
    pub auth_timeout_secs: u64,
    /// API key required on inbound requests. `None` disables auth (dev mode).
    pub api_key: Option<String>,
    /// Remote engine daemon settings; required when `engine = "remote"`.
    pub remote: Option<RemoteEngineConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Simulated,
            auth_timeout_secs: 120,
            api_key: None,
            remote: None,
        }
    }
}
