//! Session manager: the orchestration facade the dispatch surface drives.
//!
//! Translates a session name into a ready-to-use [`Session`] or a typed
//! failure. Generic over the [`EngineFactory`] port so tests pin a counted
//! scripted factory and the binary pins the real one.
//!
//! Concurrency discipline: every lifecycle mutation for a name happens under
//! that session's lifecycle mutex, so two concurrent starts cannot both
//! construct an engine handle; operations on different names share no lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use wagate_types::error::SessionError;
use wagate_types::session::{SessionConfig, SessionInfo, SessionStatus};

use crate::engine::{EngineEvent, EngineFactory};
use crate::registry::SessionRegistry;
use crate::session::Session;

/// Buffer for the per-generation engine event channel. Engines emit a
/// handful of lifecycle events; the pump drains continuously.
const EVENT_BUFFER: usize = 64;

/// Default time a session may sit in `SCAN_REQUIRED` before failing.
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Orchestration facade over the session registry.
pub struct SessionManager<F: EngineFactory> {
    registry: Arc<SessionRegistry>,
    factory: Arc<F>,
    auth_timeout: Duration,
}

impl<F: EngineFactory + 'static> SessionManager<F> {
    /// Create a manager over an injected registry.
    pub fn new(registry: Arc<SessionRegistry>, factory: F) -> Self {
        Self {
            registry,
            factory: Arc::new(factory),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }

    /// Override the `SCAN_REQUIRED` timeout.
    pub fn with_auth_timeout(mut self, auth_timeout: Duration) -> Self {
        self.auth_timeout = auth_timeout;
        self
    }

    /// Start (or get-or-create and start) the named session.
    ///
    /// Returns once the `STARTING` transition is recorded; engine
    /// construction continues in a spawned task. Idempotent while the
    /// session is already `STARTING`/`SCAN_REQUIRED`/`WORKING`.
    pub async fn start(
        &self,
        name: &str,
        config: SessionConfig,
    ) -> Result<SessionInfo, SessionError> {
        loop {
            let session = self.registry.get_or_create(name);
            let _guard = session.lifecycle.lock().await;
            // A removal may have deleted this instance while we waited for
            // the lock; only the registered instance may start, otherwise an
            // orphaned session would run outside the registry.
            if !self.registry.is_current(name, &session) {
                continue;
            }
            self.start_locked(&session, config.clone());
            return Ok(session.info());
        }
    }

    /// Stop the named session and release its engine connection.
    ///
    /// Idempotent; stopping an unknown or already `STOPPED` session is a
    /// no-op.
    pub async fn stop(&self, name: &str) -> Result<(), SessionError> {
        let Some(session) = self.registry.get(name) else {
            debug!(session = %name, "stop on unknown session is a no-op");
            return Ok(());
        };
        let _guard = session.lifecycle.lock().await;
        self.stop_locked(&session).await;
        Ok(())
    }

    /// Stop then start under a single lifecycle-lock acquisition, so no
    /// other caller can observe an intermediate `STOPPED` state and race a
    /// conflicting start.
    pub async fn restart(
        &self,
        name: &str,
        config: SessionConfig,
    ) -> Result<SessionInfo, SessionError> {
        loop {
            let session = self.registry.get_or_create(name);
            let _guard = session.lifecycle.lock().await;
            if !self.registry.is_current(name, &session) {
                continue;
            }
            self.stop_locked(&session).await;
            self.start_locked(&session, config.clone());
            return Ok(session.info());
        }
    }

    /// Resolve a name to a `WORKING` session -- the contract every opaque
    /// operation relies on.
    ///
    /// Never auto-starts: a never-started name fails with `NotFound`, an
    /// existing but unready session with `NotReady` carrying its status.
    pub fn get_working_session(&self, name: &str) -> Result<Arc<Session>, SessionError> {
        let session = self
            .registry
            .get(name)
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;
        let status = session.status();
        if status != SessionStatus::Working {
            return Err(SessionError::NotReady {
                name: name.to_string(),
                status,
            });
        }
        Ok(session)
    }

    /// Diagnostic snapshot of one session.
    pub fn session_info(&self, name: &str) -> Result<SessionInfo, SessionError> {
        self.registry
            .get(name)
            .map(|session| session.info())
            .ok_or_else(|| SessionError::NotFound(name.to_string()))
    }

    /// Lookup without creation, any state.
    pub fn get_session(&self, name: &str) -> Result<Arc<Session>, SessionError> {
        self.registry
            .get(name)
            .ok_or_else(|| SessionError::NotFound(name.to_string()))
    }

    /// Snapshot of all registered sessions.
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.registry.list()
    }

    /// Remove a terminal (`STOPPED`/`FAILED`) session from the registry.
    ///
    /// Serialized with start/stop/restart through the session's lifecycle
    /// lock, so a start that already resolved this instance either runs
    /// before the removal (removal then fails with `InvalidState`) or
    /// retries against a fresh registry entry.
    pub async fn remove(&self, name: &str) -> Result<(), SessionError> {
        loop {
            let Some(session) = self.registry.get(name) else {
                return Err(SessionError::NotFound(name.to_string()));
            };
            let _guard = session.lifecycle.lock().await;
            if !self.registry.is_current(name, &session) {
                continue;
            }
            return self.registry.remove(name);
        }
    }

    /// Record the `STARTING` transition and kick off engine construction.
    /// Caller holds the session's lifecycle lock.
    fn start_locked(&self, session: &Arc<Session>, config: SessionConfig) {
        match session.status() {
            SessionStatus::Stopped | SessionStatus::Failed => {}
            status => {
                debug!(session = %session.name(), %status, "start is a no-op");
                return;
            }
        }

        let epoch = session.bump_epoch();
        session.begin_start(config.clone());

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let factory = Arc::clone(&self.factory);
        let session = Arc::clone(session);
        let auth_timeout = self.auth_timeout;

        tokio::spawn(async move {
            let created = factory.create(session.name(), &config, events_tx).await;
            match created {
                Ok(engine) => {
                    let guard = session.lifecycle.lock().await;
                    if session.current_epoch() != epoch {
                        // A stop/restart superseded this generation while the
                        // engine was being built; discard it.
                        drop(guard);
                        engine.shutdown().await;
                        return;
                    }
                    session.install_engine(engine);
                    drop(guard);
                    // Pump events only after the handle is installed, so an
                    // immediate Authenticated cannot produce a WORKING
                    // session without an engine.
                    spawn_event_pump(session, epoch, events_rx, auth_timeout);
                }
                Err(err) => {
                    let _guard = session.lifecycle.lock().await;
                    if session.current_epoch() == epoch {
                        session.mark_failed(&format!("engine construction failed: {err}"));
                    }
                }
            }
        });
    }

    /// Tear the session down to `STOPPED`. Caller holds the lifecycle lock.
    async fn stop_locked(&self, session: &Arc<Session>) {
        if session.status() == SessionStatus::Stopped {
            return;
        }
        // Invalidate pending events and any in-flight engine construction.
        session.bump_epoch();
        let engine = session.begin_stop();
        if let Some(engine) = engine {
            engine.shutdown().await;
        }
        session.finish_stop();
    }
}

/// Forward engine events into the session state machine until the channel
/// closes or a stale epoch ends this generation.
fn spawn_event_pump(
    session: Arc<Session>,
    epoch: u64,
    mut events: mpsc::Receiver<EngineEvent>,
    auth_timeout: Duration,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if !session.apply_event(epoch, event, auth_timeout).await {
                break;
            }
        }
    });
}

impl<F: EngineFactory> std::fmt::Debug for SessionManager<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.registry.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use wagate_types::contact::{Contact, ContactsPaginationParams, NumberExistResult};
    use wagate_types::error::EngineError;
    use wagate_types::presence::{Presence, PresenceInfo, SetPresenceRequest};
    use wagate_types::status::{
        DeleteStatusRequest, ImageStatus, SentStatus, TextStatus, VideoStatus, VoiceStatus,
    };

    use crate::engine::{BoxClientEngine, ClientEngine};

    /// How the scripted factory's engines authenticate.
    #[derive(Clone, Copy)]
    enum TestAuth {
        /// Emit `Authenticated` from within `create`.
        Immediate,
        /// Emit `ScanRequired` and wait for the test to finish auth.
        Scan,
        /// Emit nothing; the test drives events by hand.
        Manual,
    }

    #[derive(Default)]
    struct TestShared {
        /// When set, every operation fails with a fatal engine error.
        fatal: AtomicBool,
        /// Event sender of the most recent engine generation.
        events: Mutex<Option<mpsc::Sender<EngineEvent>>>,
    }

    impl TestShared {
        /// Send an event on the latest generation's channel. Engine
        /// construction runs in a spawned task, so wait for it to install
        /// the sender before emitting.
        async fn emit(&self, event: EngineEvent) {
            for _ in 0..400 {
                let sender = self.events.lock().unwrap().clone();
                if let Some(sender) = sender {
                    sender.send(event).await.unwrap();
                    return;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            panic!("no engine constructed");
        }
    }

    struct TestEngine {
        shared: Arc<TestShared>,
    }

    impl TestEngine {
        fn check(&self) -> Result<(), EngineError> {
            if self.shared.fatal.load(Ordering::SeqCst) {
                Err(EngineError::Fatal("connection permanently lost".to_string()))
            } else {
                Ok(())
            }
        }

        fn sent(&self) -> SentStatus {
            SentStatus {
                id: "status-1".to_string(),
                timestamp: Utc::now(),
            }
        }
    }

    impl ClientEngine for TestEngine {
        fn kind(&self) -> &str {
            "test"
        }

        async fn get_contacts(
            &self,
            _pagination: &ContactsPaginationParams,
        ) -> Result<Vec<Contact>, EngineError> {
            self.check()?;
            Ok(vec![Contact {
                id: "11111111111@c.us".to_string(),
                name: Some("Alice".to_string()),
                push_name: None,
                is_blocked: false,
                is_business: false,
            }])
        }

        async fn get_contact(&self, contact_id: &str) -> Result<Option<Contact>, EngineError> {
            self.check()?;
            Ok(Some(Contact {
                id: contact_id.to_string(),
                name: None,
                push_name: None,
                is_blocked: false,
                is_business: false,
            }))
        }

        async fn check_number_exists(&self, phone: &str) -> Result<NumberExistResult, EngineError> {
            self.check()?;
            Ok(NumberExistResult {
                number_exists: true,
                chat_id: Some(format!("{phone}@c.us")),
            })
        }

        async fn get_contact_about(&self, _contact_id: &str) -> Result<Option<String>, EngineError> {
            self.check()?;
            Ok(None)
        }

        async fn get_profile_picture(
            &self,
            _contact_id: &str,
            _refresh: bool,
        ) -> Result<Option<String>, EngineError> {
            self.check()?;
            Ok(None)
        }

        async fn block_contact(&self, _contact_id: &str) -> Result<(), EngineError> {
            self.check()
        }

        async fn unblock_contact(&self, _contact_id: &str) -> Result<(), EngineError> {
            self.check()
        }

        async fn send_text_status(&self, _status: &TextStatus) -> Result<SentStatus, EngineError> {
            self.check()?;
            Ok(self.sent())
        }

        async fn send_image_status(&self, _status: &ImageStatus) -> Result<SentStatus, EngineError> {
            self.check()?;
            Ok(self.sent())
        }

        async fn send_voice_status(&self, _status: &VoiceStatus) -> Result<SentStatus, EngineError> {
            self.check()?;
            Ok(self.sent())
        }

        async fn send_video_status(&self, _status: &VideoStatus) -> Result<SentStatus, EngineError> {
            self.check()?;
            Ok(self.sent())
        }

        async fn delete_status(&self, _request: &DeleteStatusRequest) -> Result<(), EngineError> {
            self.check()
        }

        async fn set_presence(&self, _request: &SetPresenceRequest) -> Result<(), EngineError> {
            self.check()
        }

        async fn get_presence(&self, contact_id: &str) -> Result<PresenceInfo, EngineError> {
            self.check()?;
            Ok(PresenceInfo {
                contact_id: contact_id.to_string(),
                last_known_presence: Presence::Offline,
                last_seen: None,
            })
        }

        async fn subscribe_presence(&self, _contact_id: &str) -> Result<(), EngineError> {
            self.check()
        }

        async fn shutdown(&self) {}
    }

    #[derive(Clone)]
    struct TestFactory {
        auth: TestAuth,
        fail_create: bool,
        constructed: Arc<AtomicUsize>,
        shared: Arc<TestShared>,
    }

    impl TestFactory {
        fn new(auth: TestAuth) -> Self {
            Self {
                auth,
                fail_create: false,
                constructed: Arc::new(AtomicUsize::new(0)),
                shared: Arc::new(TestShared::default()),
            }
        }

        fn failing() -> Self {
            let mut factory = Self::new(TestAuth::Manual);
            factory.fail_create = true;
            factory
        }

        fn constructed(&self) -> usize {
            self.constructed.load(Ordering::SeqCst)
        }
    }

    impl EngineFactory for TestFactory {
        async fn create(
            &self,
            _name: &str,
            _config: &SessionConfig,
            events: mpsc::Sender<EngineEvent>,
        ) -> Result<BoxClientEngine, EngineError> {
            self.constructed.fetch_add(1, Ordering::SeqCst);
            if self.fail_create {
                return Err(EngineError::Fatal("simulated construction error".to_string()));
            }
            *self.shared.events.lock().unwrap() = Some(events.clone());
            match self.auth {
                TestAuth::Immediate => {
                    let _ = events.send(EngineEvent::Authenticated).await;
                }
                TestAuth::Scan => {
                    let _ = events
                        .send(EngineEvent::ScanRequired {
                            code: "qr-payload".to_string(),
                        })
                        .await;
                }
                TestAuth::Manual => {}
            }
            Ok(BoxClientEngine::new(TestEngine {
                shared: Arc::clone(&self.shared),
            }))
        }
    }

    fn manager(factory: TestFactory) -> SessionManager<TestFactory> {
        SessionManager::new(Arc::new(SessionRegistry::new()), factory)
    }

    async fn wait_for_status(manager: &SessionManager<TestFactory>, name: &str, status: SessionStatus) {
        for _ in 0..400 {
            if matches!(manager.session_info(name), Ok(info) if info.status == status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "session '{name}' never reached {status}, currently {:?}",
            manager.session_info(name).map(|i| i.status)
        );
    }

    #[tokio::test]
    async fn start_records_starting_then_reaches_working() {
        let mgr = manager(TestFactory::new(TestAuth::Immediate));

        let info = mgr.start("alice", SessionConfig::default()).await.unwrap();
        assert_eq!(info.status, SessionStatus::Starting);

        wait_for_status(&mgr, "alice", SessionStatus::Working).await;
        let session = mgr.get_working_session("alice").unwrap();
        let contacts = session
            .get_contacts(&ContactsPaginationParams::default())
            .await
            .unwrap();
        assert_eq!(contacts.len(), 1);
    }

    #[tokio::test]
    async fn get_working_session_on_unknown_name_is_not_found() {
        let mgr = manager(TestFactory::new(TestAuth::Immediate));
        let err = mgr.get_working_session("bob").unwrap_err();
        assert!(matches!(err, SessionError::NotFound(name) if name == "bob"));
    }

    #[tokio::test]
    async fn operation_before_auth_completes_is_not_ready_starting() {
        let mgr = manager(TestFactory::new(TestAuth::Manual));
        mgr.start("alice", SessionConfig::default()).await.unwrap();

        let err = mgr.get_working_session("alice").unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotReady {
                status: SessionStatus::Starting,
                ..
            }
        ));

        // Dispatch on the session object itself is rejected the same way.
        let session = mgr.get_session("alice").unwrap();
        let err = session
            .get_contacts(&ContactsPaginationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotReady {
                status: SessionStatus::Starting,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn repeated_start_constructs_one_engine() {
        let factory = TestFactory::new(TestAuth::Immediate);
        let mgr = manager(factory.clone());

        mgr.start("alice", SessionConfig::default()).await.unwrap();
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;
        mgr.start("alice", SessionConfig::default()).await.unwrap();

        // Still one construction: second and third starts were no-ops.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(factory.constructed(), 1);
    }

    #[tokio::test]
    async fn concurrent_starts_construct_one_engine() {
        let factory = TestFactory::new(TestAuth::Immediate);
        let mgr = Arc::new(manager(factory.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let mgr = Arc::clone(&mgr);
            handles.push(tokio::spawn(async move {
                mgr.start("alice", SessionConfig::default()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        wait_for_status(&mgr, "alice", SessionStatus::Working).await;
        assert_eq!(factory.constructed(), 1);
    }

    #[tokio::test]
    async fn stop_reaches_stopped_and_remove_succeeds() {
        let mgr = manager(TestFactory::new(TestAuth::Immediate));
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;

        // A live session cannot be removed.
        let err = mgr.remove("alice").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                status: SessionStatus::Working,
                ..
            }
        ));

        mgr.stop("alice").await.unwrap();
        assert_eq!(mgr.session_info("alice").unwrap().status, SessionStatus::Stopped);

        // Stop is idempotent.
        mgr.stop("alice").await.unwrap();

        mgr.remove("alice").await.unwrap();
        assert!(matches!(
            mgr.session_info("alice"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stop_on_unknown_name_is_noop() {
        let mgr = manager(TestFactory::new(TestAuth::Immediate));
        mgr.stop("ghost").await.unwrap();
        assert!(mgr.list_sessions().is_empty());
    }

    #[tokio::test]
    async fn fatal_operation_error_fails_session_and_restart_recovers() {
        let factory = TestFactory::new(TestAuth::Immediate);
        let mgr = manager(factory.clone());
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;

        factory.shared.fatal.store(true, Ordering::SeqCst);
        let session = mgr.get_working_session("alice").unwrap();
        let err = session
            .get_contacts(&ContactsPaginationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Engine(EngineError::Fatal(_))));

        // The fatal error dropped the session to FAILED.
        assert_eq!(mgr.session_info("alice").unwrap().status, SessionStatus::Failed);
        assert!(mgr.session_info("alice").unwrap().last_error.is_some());
        let err = mgr.get_working_session("alice").unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotReady {
                status: SessionStatus::Failed,
                ..
            }
        ));

        factory.shared.fatal.store(false, Ordering::SeqCst);
        mgr.restart("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;
        assert_eq!(factory.constructed(), 2);
        assert!(mgr.session_info("alice").unwrap().last_error.is_none());

        let session = mgr.get_working_session("alice").unwrap();
        session
            .get_contacts(&ContactsPaginationParams::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn retryable_operation_error_leaves_session_working() {
        let factory = TestFactory::new(TestAuth::Manual);
        let mgr = manager(factory.clone());
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        factory.shared.emit(EngineEvent::Authenticated).await;
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;

        // A transient disconnect is logged, not fatal.
        factory
            .shared
            .emit(EngineEvent::Disconnected {
                fatal: false,
                reason: "network blip".to_string(),
            })
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(mgr.session_info("alice").unwrap().status, SessionStatus::Working);
    }

    #[tokio::test]
    async fn fatal_disconnect_event_fails_session() {
        let factory = TestFactory::new(TestAuth::Manual);
        let mgr = manager(factory.clone());
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        factory.shared.emit(EngineEvent::Authenticated).await;
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;

        factory
            .shared
            .emit(EngineEvent::Disconnected {
                fatal: true,
                reason: "auth revoked".to_string(),
            })
            .await;
        wait_for_status(&mgr, "alice", SessionStatus::Failed).await;
        let info = mgr.session_info("alice").unwrap();
        assert_eq!(info.last_error.as_deref(), Some("auth revoked"));
    }

    #[tokio::test]
    async fn scan_flow_exposes_auth_code_then_works() {
        let factory = TestFactory::new(TestAuth::Scan);
        let mgr = manager(factory.clone());
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::ScanRequired).await;

        let session = mgr.get_session("alice").unwrap();
        assert_eq!(session.auth_code().as_deref(), Some("qr-payload"));

        factory.shared.emit(EngineEvent::Authenticated).await;
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;
        assert!(session.auth_code().is_none());
    }

    #[tokio::test]
    async fn scan_timeout_fails_session() {
        let factory = TestFactory::new(TestAuth::Scan);
        let mgr = manager(factory.clone()).with_auth_timeout(Duration::from_millis(50));
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::ScanRequired).await;
        wait_for_status(&mgr, "alice", SessionStatus::Failed).await;
        let info = mgr.session_info("alice").unwrap();
        assert!(info.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn failed_engine_construction_marks_failed() {
        let mgr = manager(TestFactory::failing());
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Failed).await;
        let info = mgr.session_info("alice").unwrap();
        assert!(info.last_error.unwrap().contains("construction"));
    }

    #[tokio::test]
    async fn restart_on_never_started_name_behaves_like_start() {
        let factory = TestFactory::new(TestAuth::Immediate);
        let mgr = manager(factory.clone());
        mgr.restart("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;
        assert_eq!(factory.constructed(), 1);
    }

    #[tokio::test]
    async fn start_parked_behind_a_removal_retries_on_the_registered_instance() {
        let factory = TestFactory::new(TestAuth::Immediate);
        let mgr = Arc::new(manager(factory.clone()));

        // Stand in for a removal in progress: the instance is resolved and
        // its lifecycle lock held.
        let stale = mgr.registry.get_or_create("alice");
        let guard = stale.lifecycle.lock().await;

        let start = {
            let mgr = Arc::clone(&mgr);
            tokio::spawn(async move { mgr.start("alice", SessionConfig::default()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The entry is deleted while the start waits on the lifecycle lock.
        mgr.registry.remove("alice").unwrap();
        drop(guard);

        start.await.unwrap().unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;

        // The working session is the registered instance; the removed one
        // was never started and holds no engine.
        let session = mgr.get_working_session("alice").unwrap();
        assert!(!Arc::ptr_eq(&session, &stale));
        assert_eq!(stale.status(), SessionStatus::Stopped);
        assert_eq!(factory.constructed(), 1);
    }

    #[tokio::test]
    async fn remove_waits_for_the_lifecycle_lock() {
        let mgr = Arc::new(manager(TestFactory::new(TestAuth::Immediate)));
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;
        mgr.stop("alice").await.unwrap();

        let session = mgr.get_session("alice").unwrap();
        let guard = session.lifecycle.lock().await;

        let remove = {
            let mgr = Arc::clone(&mgr);
            tokio::spawn(async move { mgr.remove("alice").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!remove.is_finished());

        drop(guard);
        remove.await.unwrap().unwrap();
        assert!(matches!(
            mgr.session_info("alice"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn sessions_are_isolated_across_names() {
        let factory = TestFactory::new(TestAuth::Immediate);
        let mgr = manager(factory.clone());
        mgr.start("alice", SessionConfig::default()).await.unwrap();
        mgr.start("bob", SessionConfig::default()).await.unwrap();
        wait_for_status(&mgr, "alice", SessionStatus::Working).await;
        wait_for_status(&mgr, "bob", SessionStatus::Working).await;

        mgr.stop("bob").await.unwrap();
        assert_eq!(mgr.session_info("bob").unwrap().status, SessionStatus::Stopped);
        // Stopping bob does not disturb alice.
        assert_eq!(mgr.session_info("alice").unwrap().status, SessionStatus::Working);
        assert_eq!(mgr.list_sessions().len(), 2);
    }
}
