//! Config-driven engine factory.
//!
//! Resolves which engine backs each session: the session's own config wins,
//! falling back to the gateway-wide default from `config.toml`.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use wagate_core::engine::{BoxClientEngine, EngineEvent, EngineFactory};
use wagate_types::config::{EngineKind, GatewayConfig};
use wagate_types::error::EngineError;
use wagate_types::session::SessionConfig;

use crate::remote::RemoteEngine;
use crate::simulated::{SimulatedAuth, SimulatedEngineFactory};

/// Delay before the simulated engine's fake scan completes.
const SIMULATED_SCAN_DELAY: Duration = Duration::from_secs(2);

/// Production [`EngineFactory`]: dispatches on the configured engine kind.
pub struct GatewayEngineFactory {
    config: GatewayConfig,
    simulated: SimulatedEngineFactory,
}

impl GatewayEngineFactory {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            // Fresh simulated sessions walk the scan flow so the auth
            // surface is exercised end to end.
            simulated: SimulatedEngineFactory::new(SimulatedAuth::Scan {
                scan_after: SIMULATED_SCAN_DELAY,
            }),
        }
    }

    fn engine_kind(&self, config: &SessionConfig) -> EngineKind {
        config.engine.unwrap_or(self.config.engine)
    }
}

impl EngineFactory for GatewayEngineFactory {
    async fn create(
        &self,
        name: &str,
        config: &SessionConfig,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<BoxClientEngine, EngineError> {
        let kind = self.engine_kind(config);
        info!(session = %name, engine = %kind, "creating engine");
        match kind {
            EngineKind::Simulated => self.simulated.create(name, config, events).await,
            EngineKind::Remote => {
                let remote = self.config.remote.as_ref().ok_or_else(|| {
                    EngineError::Fatal(
                        "remote engine selected but [remote] is not configured".to_string(),
                    )
                })?;
                let engine = RemoteEngine::connect(remote, config, name, events)?;
                Ok(BoxClientEngine::new(engine))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use wagate_core::manager::SessionManager;
    use wagate_core::registry::SessionRegistry;
    use wagate_types::contact::ContactsPaginationParams;
    use wagate_types::session::SessionStatus;
    use wagate_types::status::TextStatus;

    async fn wait_for_status<F: EngineFactory + 'static>(
        manager: &SessionManager<F>,
        name: &str,
        status: SessionStatus,
    ) {
        for _ in 0..400 {
            if matches!(manager.session_info(name), Ok(info) if info.status == status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session '{name}' never reached {status}");
    }

    #[tokio::test]
    async fn test_simulated_scan_lifecycle_end_to_end() {
        let factory = SimulatedEngineFactory::new(SimulatedAuth::Scan {
            scan_after: Duration::from_millis(20),
        });
        let manager = SessionManager::new(Arc::new(SessionRegistry::new()), factory);

        manager.start("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&manager, "alice", SessionStatus::ScanRequired).await;
        let session = manager.get_session("alice").unwrap();
        assert!(session.auth_code().unwrap().starts_with("wagate-sim://"));

        wait_for_status(&manager, "alice", SessionStatus::Working).await;
        let session = manager.get_working_session("alice").unwrap();

        let contacts = session
            .get_contacts(&ContactsPaginationParams::default())
            .await
            .unwrap();
        assert_eq!(contacts.len(), 3);

        let sent = session
            .send_text_status(&TextStatus {
                text: "hello from wagate".to_string(),
                background_color: None,
                font: None,
            })
            .await
            .unwrap();
        assert!(sent.id.starts_with("sim-"));

        manager.stop("alice").await.unwrap();
        assert_eq!(
            manager.session_info("alice").unwrap().status,
            SessionStatus::Stopped
        );
        manager.remove("alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_session_config_overrides_gateway_default() {
        let factory = GatewayEngineFactory::new(GatewayConfig {
            engine: EngineKind::Remote,
            ..GatewayConfig::default()
        });
        let session_config = SessionConfig {
            engine: Some(EngineKind::Simulated),
            ..SessionConfig::default()
        };
        assert_eq!(factory.engine_kind(&session_config), EngineKind::Simulated);
        assert_eq!(factory.engine_kind(&SessionConfig::default()), EngineKind::Remote);
    }

    #[tokio::test]
    async fn test_remote_without_config_fails_fatal() {
        let factory = GatewayEngineFactory::new(GatewayConfig {
            engine: EngineKind::Remote,
            ..GatewayConfig::default()
        });
        let (tx, _rx) = mpsc::channel(8);
        let err = factory
            .create("alice", &SessionConfig::default(), tx)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
