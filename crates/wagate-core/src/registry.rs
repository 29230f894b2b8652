//! Session registry: the single source of truth mapping names to sessions.
//!
//! Backed by a `DashMap` so lookups and inserts for different names proceed
//! fully in parallel; per-name atomicity comes from the map's entry API.
//! The registry is an explicitly owned object injected into the manager --
//! there is no ambient global, so tests get isolated instances.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use wagate_types::error::SessionError;
use wagate_types::session::SessionInfo;

use crate::session::Session;

/// In-process mapping from session name to [`Session`], with
/// exclusive-creation guarantees: at most one instance per name.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `name`, constructing a `STOPPED` one if absent.
    ///
    /// Concurrent calls with the same name observe the same instance; the
    /// entry API makes construction atomic per name.
    pub fn get_or_create(&self, name: &str) -> Arc<Session> {
        self.sessions
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(session = %name, "registering session");
                Arc::new(Session::new(name))
            })
            .clone()
    }

    /// Lookup without creation; resolution paths must not implicitly start
    /// a session.
    pub fn get(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.get(name).map(|entry| entry.clone())
    }

    /// True while `session` is the instance registered under `name`.
    ///
    /// A caller that resolved an instance and then waited on its lifecycle
    /// lock uses this to detect that a removal replaced or deleted the entry
    /// in the meantime.
    pub fn is_current(&self, name: &str, session: &Arc<Session>) -> bool {
        self.get(name)
            .is_some_and(|current| Arc::ptr_eq(&current, session))
    }

    /// Delete the entry for `name`.
    ///
    /// Fails with `InvalidState` unless the session is in a terminal state
    /// (`STOPPED`/`FAILED`), so a session with a live engine handle can never
    /// be removed. The status check runs under the map's shard lock.
    pub fn remove(&self, name: &str) -> Result<(), SessionError> {
        if self
            .sessions
            .remove_if(name, |_, session| session.status().is_terminal())
            .is_some()
        {
            debug!(session = %name, "session removed from registry");
            return Ok(());
        }
        match self.get(name) {
            Some(session) => Err(SessionError::InvalidState {
                name: name.to_string(),
                status: session.status(),
                reason: "session must be stopped or failed before removal".to_string(),
            }),
            None => Err(SessionError::NotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of every registered session, for the sessions API.
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| entry.value().info())
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
