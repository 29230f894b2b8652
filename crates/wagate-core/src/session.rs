//! Session: one tenant's connection handle and its lifecycle state machine.
//!
//! A `Session` owns exactly one engine handle at a time. Short-lived field
//! access goes through a `std::sync::RwLock` (never held across an await);
//! lifecycle transitions are serialized by the per-session `lifecycle` mutex
//! so no transition overlaps another for the same session. Each start bumps
//! an epoch counter; engine events and deferred work carry the epoch they
//! belong to and are discarded when a newer generation has taken over.
//!
//! Operation dispatch clones the engine `Arc` out of the lock, so a
//! stop/restart never exposes a torn handle to an in-flight call: the call
//! completes against the still-valid handle or fails once the engine
//! connection is shut down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use wagate_types::contact::{Contact, ContactsPaginationParams, NumberExistResult};
use wagate_types::error::{EngineError, SessionError};
use wagate_types::presence::{PresenceInfo, SetPresenceRequest};
use wagate_types::session::{SessionConfig, SessionInfo, SessionStatus};
use wagate_types::status::{
    DeleteStatusRequest, ImageStatus, SentStatus, TextStatus, VideoStatus, VoiceStatus,
};

use crate::engine::{BoxClientEngine, EngineEvent};

/// Mutable portion of a session, guarded by `Session::state`.
struct SessionState {
    status: SessionStatus,
    config: SessionConfig,
    engine: Option<Arc<BoxClientEngine>>,
    last_error: Option<String>,
    /// QR payload to scan, present only while `SCAN_REQUIRED`.
    auth_code: Option<String>,
    status_changed_at: DateTime<Utc>,
}

/// One tenant's connection to the chat network.
pub struct Session {
    name: String,
    created_at: DateTime<Utc>,
    state: RwLock<SessionState>,
    /// Serializes lifecycle transitions. Held across engine construction
    /// epoch checks, event application, and shutdown -- never by operation
    /// dispatch itself.
    pub(crate) lifecycle: Mutex<()>,
    /// Incremented on every start and stop; invalidates events and deferred
    /// work from previous engine generations.
    epoch: AtomicU64,
}

impl Session {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            state: RwLock::new(SessionState {
                status: SessionStatus::Stopped,
                config: SessionConfig::default(),
                engine: None,
                last_error: None,
                auth_code: None,
                status_changed_at: now,
            }),
            lifecycle: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> SessionStatus {
        self.read_state().status
    }

    /// QR payload for interactive auth, present only while `SCAN_REQUIRED`.
    pub fn auth_code(&self) -> Option<String> {
        self.read_state().auth_code.clone()
    }

    /// Diagnostic snapshot for the sessions API.
    pub fn info(&self) -> SessionInfo {
        let state = self.read_state();
        SessionInfo {
            name: self.name.clone(),
            status: state.status,
            config: state.config.clone(),
            last_error: state.last_error.clone(),
            created_at: self.created_at,
            status_changed_at: state.status_changed_at,
        }
    }

    pub(crate) fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(state: &mut SessionState, status: SessionStatus) {
        state.status = status;
        state.status_changed_at = Utc::now();
    }

    // ------------------------------------------------------------------
    // Lifecycle mutations. Callers hold the `lifecycle` mutex.
    // ------------------------------------------------------------------

    /// Enter `STARTING`: discard the previous engine generation's leftovers
    /// and clear the last failure.
    pub(crate) fn begin_start(&self, config: SessionConfig) {
        let mut state = self.write_state();
        Self::set_status(&mut state, SessionStatus::Starting);
        state.config = config;
        state.engine = None;
        state.last_error = None;
        state.auth_code = None;
        info!(session = %self.name, "session starting");
    }

    /// Install a freshly constructed engine handle. The session stays
    /// `STARTING` until the engine reports authentication.
    pub(crate) fn install_engine(&self, engine: BoxClientEngine) {
        let mut state = self.write_state();
        debug!(session = %self.name, engine = engine.kind(), "engine handle installed");
        state.engine = Some(Arc::new(engine));
    }

    /// Enter `STOPPING` and hand the engine back for shutdown.
    pub(crate) fn begin_stop(&self) -> Option<Arc<BoxClientEngine>> {
        let mut state = self.write_state();
        Self::set_status(&mut state, SessionStatus::Stopping);
        state.auth_code = None;
        state.engine.take()
    }

    /// Finish the stop: the engine connection is fully released.
    pub(crate) fn finish_stop(&self) {
        let mut state = self.write_state();
        Self::set_status(&mut state, SessionStatus::Stopped);
        info!(session = %self.name, "session stopped");
    }

    /// Enter `FAILED`, recording the reason and discarding the engine handle
    /// (returned for best-effort shutdown).
    pub(crate) fn mark_failed(&self, reason: &str) -> Option<Arc<BoxClientEngine>> {
        let mut state = self.write_state();
        Self::set_status(&mut state, SessionStatus::Failed);
        state.last_error = Some(reason.to_string());
        state.auth_code = None;
        warn!(session = %self.name, %reason, "session failed");
        state.engine.take()
    }

    /// Apply an engine event to the state machine.
    ///
    /// Returns `false` when the event belongs to a stale engine generation;
    /// the pump stops on that signal.
    pub(crate) async fn apply_event(
        self: &Arc<Self>,
        epoch: u64,
        event: EngineEvent,
        auth_timeout: Duration,
    ) -> bool {
        let _guard = self.lifecycle.lock().await;
        if self.current_epoch() != epoch {
            debug!(session = %self.name, ?event, "discarding stale engine event");
            return false;
        }

        match event {
            EngineEvent::ScanRequired { code } => {
                let mut state = self.write_state();
                if state.status == SessionStatus::Starting {
                    Self::set_status(&mut state, SessionStatus::ScanRequired);
                    state.auth_code = Some(code);
                    drop(state);
                    info!(session = %self.name, "authentication scan required");
                    self.arm_auth_timeout(epoch, auth_timeout);
                } else {
                    debug!(
                        session = %self.name,
                        status = %state.status,
                        "ignoring scan-required event outside STARTING"
                    );
                }
            }
            EngineEvent::Authenticated => {
                let mut state = self.write_state();
                match state.status {
                    SessionStatus::Starting | SessionStatus::ScanRequired => {
                        Self::set_status(&mut state, SessionStatus::Working);
                        state.auth_code = None;
                        drop(state);
                        info!(session = %self.name, "session working");
                    }
                    status => {
                        debug!(
                            session = %self.name,
                            %status,
                            "ignoring authenticated event"
                        );
                    }
                }
            }
            EngineEvent::Disconnected { fatal: false, reason } => {
                warn!(session = %self.name, %reason, "transient engine disconnect");
            }
            EngineEvent::Disconnected { fatal: true, reason } => {
                let engine = self.mark_failed(&reason);
                if let Some(engine) = engine {
                    engine.shutdown().await;
                }
            }
        }
        true
    }

    /// Arm the `SCAN_REQUIRED -> FAILED` timeout for this engine generation.
    fn arm_auth_timeout(self: &Arc<Self>, epoch: u64, auth_timeout: Duration) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(auth_timeout).await;
            let _guard = session.lifecycle.lock().await;
            if session.current_epoch() != epoch {
                return;
            }
            if session.status() == SessionStatus::ScanRequired {
                let engine = session.mark_failed("authentication timed out");
                if let Some(engine) = engine {
                    engine.shutdown().await;
                }
            }
        });
    }

    /// Drop to `FAILED` after a fatal operation error, unless the engine that
    /// produced the error has already been replaced or torn down.
    async fn fail_from_operation(&self, failed_engine: &Arc<BoxClientEngine>, reason: &str) {
        let _guard = self.lifecycle.lock().await;
        let engine = {
            let state = self.read_state();
            let same_engine = state
                .engine
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, failed_engine));
            if state.status != SessionStatus::Working || !same_engine {
                debug!(session = %self.name, "fatal operation error from superseded engine");
                return;
            }
            drop(state);
            self.mark_failed(reason)
        };
        if let Some(engine) = engine {
            engine.shutdown().await;
        }
    }

    // ------------------------------------------------------------------
    // Operation dispatch
    // ------------------------------------------------------------------

    /// The dispatch precondition: `WORKING` with an installed engine.
    ///
    /// Fails immediately when not met -- operations never queue or wait,
    /// so callers see backpressure instead of hangs.
    fn working_engine(&self) -> Result<Arc<BoxClientEngine>, SessionError> {
        let state = self.read_state();
        match (&state.status, &state.engine) {
            (SessionStatus::Working, Some(engine)) => Ok(Arc::clone(engine)),
            _ => Err(SessionError::NotReady {
                name: self.name.clone(),
                status: state.status,
            }),
        }
    }

    /// Map an operation result: fatal engine errors fail the session,
    /// everything else is propagated verbatim.
    async fn finish_dispatch<T>(
        &self,
        engine: &Arc<BoxClientEngine>,
        result: Result<T, EngineError>,
    ) -> Result<T, SessionError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if err.is_fatal() {
                    self.fail_from_operation(engine, &err.to_string()).await;
                }
                Err(SessionError::Engine(err))
            }
        }
    }

    pub async fn get_contacts(
        &self,
        pagination: &ContactsPaginationParams,
    ) -> Result<Vec<Contact>, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.get_contacts(pagination).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<Option<Contact>, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.get_contact(contact_id).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn check_number_exists(
        &self,
        phone: &str,
    ) -> Result<NumberExistResult, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.check_number_exists(phone).await;
        self.finish_dispatch(&engine, result).await
    }

    /// Returns `Ok(None)` when the contact's privacy settings deny access.
    pub async fn get_contact_about(
        &self,
        contact_id: &str,
    ) -> Result<Option<String>, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.get_contact_about(contact_id).await;
        self.finish_dispatch(&engine, result).await
    }

    /// Returns `Ok(None)` when the contact's privacy settings deny access.
    pub async fn get_profile_picture(
        &self,
        contact_id: &str,
        refresh: bool,
    ) -> Result<Option<String>, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.get_profile_picture(contact_id, refresh).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn block_contact(&self, contact_id: &str) -> Result<(), SessionError> {
        let engine = self.working_engine()?;
        let result = engine.block_contact(contact_id).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn unblock_contact(&self, contact_id: &str) -> Result<(), SessionError> {
        let engine = self.working_engine()?;
        let result = engine.unblock_contact(contact_id).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn send_text_status(&self, status: &TextStatus) -> Result<SentStatus, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.send_text_status(status).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn send_image_status(
        &self,
        status: &ImageStatus,
    ) -> Result<SentStatus, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.send_image_status(status).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn send_voice_status(
        &self,
        status: &VoiceStatus,
    ) -> Result<SentStatus, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.send_voice_status(status).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn send_video_status(
        &self,
        status: &VideoStatus,
    ) -> Result<SentStatus, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.send_video_status(status).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn delete_status(&self, request: &DeleteStatusRequest) -> Result<(), SessionError> {
        let engine = self.working_engine()?;
        let result = engine.delete_status(request).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn set_presence(&self, request: &SetPresenceRequest) -> Result<(), SessionError> {
        let engine = self.working_engine()?;
        let result = engine.set_presence(request).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn get_presence(&self, contact_id: &str) -> Result<PresenceInfo, SessionError> {
        let engine = self.working_engine()?;
        let result = engine.get_presence(contact_id).await;
        self.finish_dispatch(&engine, result).await
    }

    pub async fn subscribe_presence(&self, contact_id: &str) -> Result<(), SessionError> {
        let engine = self.working_engine()?;
        let result = engine.subscribe_presence(contact_id).await;
        self.finish_dispatch(&engine, result).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("status", &state.status)
            .field("has_engine", &state.engine.is_some())
            .finish()
    }
}
