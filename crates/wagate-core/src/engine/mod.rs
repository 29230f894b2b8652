//! Engine trait definitions.
//!
//! A [`ClientEngine`] is one session's underlying chat-network connection:
//! the opaque handle every tenant-facing operation is forwarded to. The wire
//! protocol behind it is fully encapsulated; this layer only specifies the
//! operation surface, the error classification, and the event callbacks the
//! engine feeds back into the session state machine.

pub mod boxed;

use tokio::sync::mpsc;

use wagate_types::contact::{Contact, ContactsPaginationParams, NumberExistResult};
use wagate_types::error::EngineError;
use wagate_types::presence::{PresenceInfo, SetPresenceRequest};
use wagate_types::session::SessionConfig;
use wagate_types::status::{
    DeleteStatusRequest, ImageStatus, SentStatus, TextStatus, VideoStatus, VoiceStatus,
};

pub use boxed::BoxClientEngine;

/// Asynchronous events an engine pushes into its session's state machine.
///
/// These model the unpredictable external side of session establishment
/// (interactive auth, network drops) as explicit state-machine inputs. Events
/// are applied through the session's serialized transition point, never
/// directly by the engine's own tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Interactive authentication is required; `code` is the QR payload the
    /// tenant must scan.
    ScanRequired { code: String },
    /// Authentication completed; the connection is usable.
    Authenticated,
    /// The connection dropped. `fatal` follows the [`EngineError`]
    /// classification: fatal drops fail the session, transient ones do not.
    Disconnected { fatal: bool, reason: String },
}

/// Trait for chat-network engine backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition, no async_trait
/// macro). Implementations live in `wagate-engine`; the orchestration layer
/// only ever holds engines through [`BoxClientEngine`].
///
/// Per-operation contracts:
/// - `get_contact_about` and `get_profile_picture` return `Ok(None)` when the
///   contact's privacy settings deny access -- a legitimate empty result,
///   not an error.
/// - All other errors are classified retryable or fatal via [`EngineError`];
///   implementations must never block indefinitely.
pub trait ClientEngine: Send + Sync {
    /// Short implementation name for logs, e.g. "simulated", "remote".
    fn kind(&self) -> &str;

    fn get_contacts(
        &self,
        pagination: &ContactsPaginationParams,
    ) -> impl std::future::Future<Output = Result<Vec<Contact>, EngineError>> + Send;

    fn get_contact(
        &self,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Contact>, EngineError>> + Send;

    fn check_number_exists(
        &self,
        phone: &str,
    ) -> impl std::future::Future<Output = Result<NumberExistResult, EngineError>> + Send;

    fn get_contact_about(
        &self,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, EngineError>> + Send;

    fn get_profile_picture(
        &self,
        contact_id: &str,
        refresh: bool,
    ) -> impl std::future::Future<Output = Result<Option<String>, EngineError>> + Send;

    fn block_contact(
        &self,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<(), EngineError>> + Send;

    fn unblock_contact(
        &self,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<(), EngineError>> + Send;

    fn send_text_status(
        &self,
        status: &TextStatus,
    ) -> impl std::future::Future<Output = Result<SentStatus, EngineError>> + Send;

    fn send_image_status(
        &self,
        status: &ImageStatus,
    ) -> impl std::future::Future<Output = Result<SentStatus, EngineError>> + Send;

    fn send_voice_status(
        &self,
        status: &VoiceStatus,
    ) -> impl std::future::Future<Output = Result<SentStatus, EngineError>> + Send;

    fn send_video_status(
        &self,
        status: &VideoStatus,
    ) -> impl std::future::Future<Output = Result<SentStatus, EngineError>> + Send;

    fn delete_status(
        &self,
        request: &DeleteStatusRequest,
    ) -> impl std::future::Future<Output = Result<(), EngineError>> + Send;

    fn set_presence(
        &self,
        request: &SetPresenceRequest,
    ) -> impl std::future::Future<Output = Result<(), EngineError>> + Send;

    fn get_presence(
        &self,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<PresenceInfo, EngineError>> + Send;

    fn subscribe_presence(
        &self,
        contact_id: &str,
    ) -> impl std::future::Future<Output = Result<(), EngineError>> + Send;

    /// Release the underlying connection. Idempotent; in-flight operations
    /// fail once the connection is gone.
    fn shutdown(&self) -> impl std::future::Future<Output = ()> + Send;
}

/// Constructs engine handles for sessions.
///
/// `create` is called from a spawned task during the `STARTING` transition.
/// The factory is handed the session's event sender; the engine (or the
/// factory's own tasks) pushes [`EngineEvent`]s through it for the lifetime
/// of this engine generation. Events sent before the session starts pumping
/// sit in the channel, so emitting from within `create` is fine.
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        name: &str,
        config: &SessionConfig,
        events: mpsc::Sender<EngineEvent>,
    ) -> impl std::future::Future<Output = Result<BoxClientEngine, EngineError>> + Send;
}
