//! Gateway configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.wagate/` in production)
//! and deserializes it into [`GatewayConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::{Path, PathBuf};

use wagate_types::config::GatewayConfig;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `WAGATE_DATA_DIR` environment variable
/// 2. `~/.wagate`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WAGATE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".wagate");
    }

    // Last resort: current directory
    PathBuf::from(".wagate")
}

/// Load gateway configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GatewayConfig::default()`]
///   (simulated engine, 120s auth timeout, no API key).
/// - If the file exists but fails to parse, logs a warning and returns the
///   default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_gateway_config(data_dir: &Path) -> GatewayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GatewayConfig::default()
        }
    }
}
