//! Application state wiring the orchestration layer together.
//!
//! The session manager is generic over the engine factory, but AppState pins
//! it to the production [`GatewayEngineFactory`] so handlers work with one
//! concrete type.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use wagate_core::manager::SessionManager;
use wagate_core::registry::SessionRegistry;
use wagate_engine::{GatewayEngineFactory, load_gateway_config, resolve_data_dir};
use wagate_types::config::GatewayConfig;

use crate::http::extractors::auth::hash_api_key;

/// Session manager pinned to the production engine factory.
pub type ConcreteSessionManager = SessionManager<GatewayEngineFactory>;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConcreteSessionManager>,
    /// SHA-256 hash of the required API key; `None` disables auth (dev mode).
    pub api_key_hash: Option<String>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, wire the manager.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_gateway_config(&data_dir).await;
        Ok(Self::from_config(config, data_dir))
    }

    /// Wire state from an already-loaded config. Split out so tests can
    /// inject configuration without touching the filesystem.
    pub fn from_config(config: GatewayConfig, data_dir: PathBuf) -> Self {
        // Environment overrides the config file for the inbound API key.
        let api_key = std::env::var("WAGATE_API_KEY")
            .ok()
            .or_else(|| config.api_key.clone());
        let api_key_hash = api_key.as_deref().map(hash_api_key);

        let auth_timeout = Duration::from_secs(config.auth_timeout_secs);
        let factory = GatewayEngineFactory::new(config);
        let manager = SessionManager::new(Arc::new(SessionRegistry::new()), factory)
            .with_auth_timeout(auth_timeout);

        Self {
            manager: Arc::new(manager),
            api_key_hash,
            data_dir,
        }
    }
}
