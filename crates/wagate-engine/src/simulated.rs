//! Deterministic in-memory engine.
//!
//! Backs development and tests without a real chat-network connection. All
//! state lives in process memory; behavior is deterministic apart from
//! generated IDs and timestamps.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use wagate_core::engine::{BoxClientEngine, ClientEngine, EngineEvent, EngineFactory};
use wagate_types::contact::{Contact, ContactsPaginationParams, NumberExistResult};
use wagate_types::error::EngineError;
use wagate_types::presence::{Presence, PresenceInfo, SetPresenceRequest};
use wagate_types::session::SessionConfig;
use wagate_types::status::{
    DeleteStatusRequest, ImageStatus, SentStatus, StatusMedia, TextStatus, VideoStatus, VoiceStatus,
};

/// How simulated sessions authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedAuth {
    /// Authenticate from within engine construction, as a restored session
    /// with saved credentials would.
    Immediate,
    /// Require a scan, then authenticate after the given delay as if the
    /// tenant scanned the code.
    Scan { scan_after: Duration },
}

#[derive(Default)]
struct SimState {
    contacts: Vec<Contact>,
    blocked: HashSet<String>,
    /// Contact IDs whose privacy settings hide about text and picture.
    private: HashSet<String>,
    statuses: HashSet<String>,
    presence: HashMap<String, PresenceInfo>,
    subscriptions: HashSet<String>,
    own_presence: Presence,
}

/// In-memory [`ClientEngine`] with a small seeded address book.
pub struct SimulatedEngine {
    session: String,
    state: RwLock<SimState>,
    closed: AtomicBool,
}

impl SimulatedEngine {
    pub fn new(session: &str) -> Self {
        let mut state = SimState::default();
        state.contacts = vec![
            Contact {
                id: "11111111111@c.us".to_string(),
                name: Some("Alice Example".to_string()),
                push_name: Some("Alice".to_string()),
                is_blocked: false,
                is_business: false,
            },
            Contact {
                id: "22222222222@c.us".to_string(),
                name: Some("Bob Example".to_string()),
                push_name: Some("Bob".to_string()),
                is_blocked: false,
                is_business: true,
            },
            Contact {
                id: "33333333333@c.us".to_string(),
                name: None,
                push_name: Some("Carol".to_string()),
                is_blocked: false,
                is_business: false,
            },
        ];
        // Carol hides her about text and profile picture.
        state.private.insert("33333333333@c.us".to_string());

        Self {
            session: session.to_string(),
            state: RwLock::new(state),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(EngineError::Fatal("engine connection closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn validate_media(media: &StatusMedia) -> Result<(), EngineError> {
        if media.url.is_none() && media.data.is_none() {
            return Err(EngineError::Retryable(
                "status media requires either url or data".to_string(),
            ));
        }
        Ok(())
    }

    fn sent(&self) -> SentStatus {
        SentStatus {
            id: format!("sim-{}", Uuid::now_v7()),
            timestamp: Utc::now(),
        }
    }

    fn with_block_flag(&self, state: &SimState, contact: &Contact) -> Contact {
        Contact {
            is_blocked: state.blocked.contains(&contact.id),
            ..contact.clone()
        }
    }

    async fn record_status(&self, sent: &SentStatus) {
        self.state.write().await.statuses.insert(sent.id.clone());
    }
}

impl ClientEngine for SimulatedEngine {
    fn kind(&self) -> &str {
        "simulated"
    }

    async fn get_contacts(
        &self,
        pagination: &ContactsPaginationParams,
    ) -> Result<Vec<Contact>, EngineError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        let mut contacts: Vec<Contact> = state
            .contacts
            .iter()
            .map(|c| self.with_block_flag(&state, c))
            .collect();

        match pagination.sort_by.as_deref() {
            Some("name") => contacts.sort_by(|a, b| a.name.cmp(&b.name)),
            // Unknown sort fields fall back to ID order.
            _ => contacts.sort_by(|a, b| a.id.cmp(&b.id)),
        }

        let offset = pagination.offset.unwrap_or(0) as usize;
        let contacts: Vec<Contact> = match pagination.limit {
            Some(limit) => contacts.into_iter().skip(offset).take(limit as usize).collect(),
            None => contacts.into_iter().skip(offset).collect(),
        };
        Ok(contacts)
    }

    async fn get_contact(&self, contact_id: &str) -> Result<Option<Contact>, EngineError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        Ok(state
            .contacts
            .iter()
            .find(|c| c.id == contact_id)
            .map(|c| self.with_block_flag(&state, c)))
    }

    async fn check_number_exists(&self, phone: &str) -> Result<NumberExistResult, EngineError> {
        self.ensure_open()?;
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        let chat_id = format!("{digits}@c.us");

        let known = self.state.read().await.contacts.iter().any(|c| c.id == chat_id);
        // Unknown numbers of plausible length count as registered.
        if known || (10..=15).contains(&digits.len()) {
            Ok(NumberExistResult {
                number_exists: true,
                chat_id: Some(chat_id),
            })
        } else {
            Ok(NumberExistResult {
                number_exists: false,
                chat_id: None,
            })
        }
    }

    async fn get_contact_about(&self, contact_id: &str) -> Result<Option<String>, EngineError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        if state.private.contains(contact_id) {
            return Ok(None);
        }
        Ok(state
            .contacts
            .iter()
            .find(|c| c.id == contact_id)
            .map(|_| "Hey there! I am using Wagate.".to_string()))
    }

    async fn get_profile_picture(
        &self,
        contact_id: &str,
        _refresh: bool,
    ) -> Result<Option<String>, EngineError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        if state.private.contains(contact_id) {
            return Ok(None);
        }
        Ok(state
            .contacts
            .iter()
            .find(|c| c.id == contact_id)
            .map(|c| format!("https://simulated.invalid/avatar/{}.jpg", c.id)))
    }

    async fn block_contact(&self, contact_id: &str) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.state.write().await.blocked.insert(contact_id.to_string());
        debug!(session = %self.session, contact = %contact_id, "contact blocked");
        Ok(())
    }

    async fn unblock_contact(&self, contact_id: &str) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.state.write().await.blocked.remove(contact_id);
        debug!(session = %self.session, contact = %contact_id, "contact unblocked");
        Ok(())
    }

    async fn send_text_status(&self, status: &TextStatus) -> Result<SentStatus, EngineError> {
        self.ensure_open()?;
        if status.text.is_empty() {
            return Err(EngineError::Retryable("status text must not be empty".to_string()));
        }
        let sent = self.sent();
        self.record_status(&sent).await;
        Ok(sent)
    }

    async fn send_image_status(&self, status: &ImageStatus) -> Result<SentStatus, EngineError> {
        self.ensure_open()?;
        Self::validate_media(&status.media)?;
        let sent = self.sent();
        self.record_status(&sent).await;
        Ok(sent)
    }

    async fn send_voice_status(&self, status: &VoiceStatus) -> Result<SentStatus, EngineError> {
        self.ensure_open()?;
        Self::validate_media(&status.media)?;
        let sent = self.sent();
        self.record_status(&sent).await;
        Ok(sent)
    }

    async fn send_video_status(&self, status: &VideoStatus) -> Result<SentStatus, EngineError> {
        self.ensure_open()?;
        Self::validate_media(&status.media)?;
        let sent = self.sent();
        self.record_status(&sent).await;
        Ok(sent)
    }

    async fn delete_status(&self, request: &DeleteStatusRequest) -> Result<(), EngineError> {
        self.ensure_open()?;
        // Deleting an unknown or already-deleted status is idempotent.
        self.state.write().await.statuses.remove(&request.id);
        Ok(())
    }

    async fn set_presence(&self, request: &SetPresenceRequest) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.state.write().await.own_presence = request.presence;
        Ok(())
    }

    async fn get_presence(&self, contact_id: &str) -> Result<PresenceInfo, EngineError> {
        self.ensure_open()?;
        let state = self.state.read().await;
        Ok(state
            .presence
            .get(contact_id)
            .cloned()
            .unwrap_or_else(|| PresenceInfo {
                contact_id: contact_id.to_string(),
                last_known_presence: Presence::Offline,
                last_seen: None,
            }))
    }

    async fn subscribe_presence(&self, contact_id: &str) -> Result<(), EngineError> {
        self.ensure_open()?;
        let mut state = self.state.write().await;
        state.subscriptions.insert(contact_id.to_string());
        // Subscribed contacts show up online immediately.
        state.presence.insert(
            contact_id.to_string(),
            PresenceInfo {
                contact_id: contact_id.to_string(),
                last_known_presence: Presence::Online,
                last_seen: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        debug!(session = %self.session, "simulated engine shut down");
    }
}

/// Factory producing [`SimulatedEngine`]s.
#[derive(Debug, Clone)]
pub struct SimulatedEngineFactory {
    auth: SimulatedAuth,
}

impl SimulatedEngineFactory {
    pub fn new(auth: SimulatedAuth) -> Self {
        Self { auth }
    }
}

impl Default for SimulatedEngineFactory {
    fn default() -> Self {
        Self::new(SimulatedAuth::Immediate)
    }
}

impl EngineFactory for SimulatedEngineFactory {
    async fn create(
        &self,
        name: &str,
        _config: &SessionConfig,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<BoxClientEngine, EngineError> {
        match self.auth {
            SimulatedAuth::Immediate => {
                let _ = events.send(EngineEvent::Authenticated).await;
            }
            SimulatedAuth::Scan { scan_after } => {
                let code = format!("wagate-sim://{}", Uuid::now_v7());
                let _ = events.send(EngineEvent::ScanRequired { code }).await;
                // Play the tenant's part: scan succeeds after the delay.
                tokio::spawn(async move {
                    tokio::time::sleep(scan_after).await;
                    let _ = events.send(EngineEvent::Authenticated).await;
                });
            }
        }
        Ok(BoxClientEngine::new(SimulatedEngine::new(name)))
    }
}
