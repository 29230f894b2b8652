//! BoxClientEngine -- object-safe dynamic dispatch wrapper for ClientEngine.
//!
//! 1. Define an object-safe `ClientEngineDyn` trait with boxed futures
//! 2. Blanket-impl `ClientEngineDyn` for all `T: ClientEngine`
//! 3. `BoxClientEngine` wraps `Box<dyn ClientEngineDyn>` and delegates
//!
//! Sessions pick their engine at start time from per-session config, so the
//! orchestration layer must hold engines behind dynamic dispatch; RPITIT
//! traits are not object-safe, hence this wrapper.

use std::future::Future;
use std::pin::Pin;

use wagate_types::contact::{Contact, ContactsPaginationParams, NumberExistResult};
use wagate_types::error::EngineError;
use wagate_types::presence::{PresenceInfo, SetPresenceRequest};
use wagate_types::status::{
    DeleteStatusRequest, ImageStatus, SentStatus, TextStatus, VideoStatus, VoiceStatus,
};

use super::ClientEngine;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`ClientEngine`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn ClientEngineDyn`).
/// A blanket implementation is provided for all types implementing
/// `ClientEngine`.
pub trait ClientEngineDyn: Send + Sync {
    fn kind(&self) -> &str;

    fn get_contacts_boxed<'a>(
        &'a self,
        pagination: &'a ContactsPaginationParams,
    ) -> BoxFuture<'a, Result<Vec<Contact>, EngineError>>;

    fn get_contact_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Contact>, EngineError>>;

    fn check_number_exists_boxed<'a>(
        &'a self,
        phone: &'a str,
    ) -> BoxFuture<'a, Result<NumberExistResult, EngineError>>;

    fn get_contact_about_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, EngineError>>;

    fn get_profile_picture_boxed<'a>(
        &'a self,
        contact_id: &'a str,
        refresh: bool,
    ) -> BoxFuture<'a, Result<Option<String>, EngineError>>;

    fn block_contact_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<(), EngineError>>;

    fn unblock_contact_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<(), EngineError>>;

    fn send_text_status_boxed<'a>(
        &'a self,
        status: &'a TextStatus,
    ) -> BoxFuture<'a, Result<SentStatus, EngineError>>;

    fn send_image_status_boxed<'a>(
        &'a self,
        status: &'a ImageStatus,
    ) -> BoxFuture<'a, Result<SentStatus, EngineError>>;

    fn send_voice_status_boxed<'a>(
        &'a self,
        status: &'a VoiceStatus,
    ) -> BoxFuture<'a, Result<SentStatus, EngineError>>;

    fn send_video_status_boxed<'a>(
        &'a self,
        status: &'a VideoStatus,
    ) -> BoxFuture<'a, Result<SentStatus, EngineError>>;

    fn delete_status_boxed<'a>(
        &'a self,
        request: &'a DeleteStatusRequest,
    ) -> BoxFuture<'a, Result<(), EngineError>>;

    fn set_presence_boxed<'a>(
        &'a self,
        request: &'a SetPresenceRequest,
    ) -> BoxFuture<'a, Result<(), EngineError>>;

    fn get_presence_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<PresenceInfo, EngineError>>;

    fn subscribe_presence_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<(), EngineError>>;

    fn shutdown_boxed(&self) -> BoxFuture<'_, ()>;
}

/// Blanket implementation: any `ClientEngine` automatically implements
/// `ClientEngineDyn`.
impl<T: ClientEngine> ClientEngineDyn for T {
    fn kind(&self) -> &str {
        ClientEngine::kind(self)
    }

    fn get_contacts_boxed<'a>(
        &'a self,
        pagination: &'a ContactsPaginationParams,
    ) -> BoxFuture<'a, Result<Vec<Contact>, EngineError>> {
        Box::pin(self.get_contacts(pagination))
    }

    fn get_contact_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Contact>, EngineError>> {
        Box::pin(self.get_contact(contact_id))
    }

    fn check_number_exists_boxed<'a>(
        &'a self,
        phone: &'a str,
    ) -> BoxFuture<'a, Result<NumberExistResult, EngineError>> {
        Box::pin(self.check_number_exists(phone))
    }

    fn get_contact_about_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, EngineError>> {
        Box::pin(self.get_contact_about(contact_id))
    }

    fn get_profile_picture_boxed<'a>(
        &'a self,
        contact_id: &'a str,
        refresh: bool,
    ) -> BoxFuture<'a, Result<Option<String>, EngineError>> {
        Box::pin(self.get_profile_picture(contact_id, refresh))
    }

    fn block_contact_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(self.block_contact(contact_id))
    }

    fn unblock_contact_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(self.unblock_contact(contact_id))
    }

    fn send_text_status_boxed<'a>(
        &'a self,
        status: &'a TextStatus,
    ) -> BoxFuture<'a, Result<SentStatus, EngineError>> {
        Box::pin(self.send_text_status(status))
    }

    fn send_image_status_boxed<'a>(
        &'a self,
        status: &'a ImageStatus,
    ) -> BoxFuture<'a, Result<SentStatus, EngineError>> {
        Box::pin(self.send_image_status(status))
    }

    fn send_voice_status_boxed<'a>(
        &'a self,
        status: &'a VoiceStatus,
    ) -> BoxFuture<'a, Result<SentStatus, EngineError>> {
        Box::pin(self.send_voice_status(status))
    }

    fn send_video_status_boxed<'a>(
        &'a self,
        status: &'a VideoStatus,
    ) -> BoxFuture<'a, Result<SentStatus, EngineError>> {
        Box::pin(self.send_video_status(status))
    }

    fn delete_status_boxed<'a>(
        &'a self,
        request: &'a DeleteStatusRequest,
    ) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(self.delete_status(request))
    }

    fn set_presence_boxed<'a>(
        &'a self,
        request: &'a SetPresenceRequest,
    ) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(self.set_presence(request))
    }

    fn get_presence_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<PresenceInfo, EngineError>> {
        Box::pin(self.get_presence(contact_id))
    }

    fn subscribe_presence_boxed<'a>(
        &'a self,
        contact_id: &'a str,
    ) -> BoxFuture<'a, Result<(), EngineError>> {
        Box::pin(self.subscribe_presence(contact_id))
    }

    fn shutdown_boxed(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.shutdown())
    }
}

/// Type-erased engine handle.
///
/// Wraps any `ClientEngine` implementation behind dynamic dispatch so the
/// session layer can hold whichever engine the session's config selected.
/// Provides equivalent methods that delegate to the inner `ClientEngineDyn`
/// trait object.
pub struct BoxClientEngine {
    inner: Box<dyn ClientEngineDyn + Send + Sync>,
}

impl BoxClientEngine {
    /// Wrap a concrete `ClientEngine` in a type-erased box.
    pub fn new<T: ClientEngine + 'static>(engine: T) -> Self {
        Self {
            inner: Box::new(engine),
        }
    }

    pub fn kind(&self) -> &str {
        self.inner.kind()
    }

    pub async fn get_contacts(
        &self,
        pagination: &ContactsPaginationParams,
    ) -> Result<Vec<Contact>, EngineError> {
        self.inner.get_contacts_boxed(pagination).await
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<Option<Contact>, EngineError> {
        self.inner.get_contact_boxed(contact_id).await
    }

    pub async fn check_number_exists(&self, phone: &str) -> Result<NumberExistResult, EngineError> {
        self.inner.check_number_exists_boxed(phone).await
    }

    pub async fn get_contact_about(&self, contact_id: &str) -> Result<Option<String>, EngineError> {
        self.inner.get_contact_about_boxed(contact_id).await
    }

    pub async fn get_profile_picture(
        &self,
        contact_id: &str,
        refresh: bool,
    ) -> Result<Option<String>, EngineError> {
        self.inner.get_profile_picture_boxed(contact_id, refresh).await
    }

    pub async fn block_contact(&self, contact_id: &str) -> Result<(), EngineError> {
        self.inner.block_contact_boxed(contact_id).await
    }

    pub async fn unblock_contact(&self, contact_id: &str) -> Result<(), EngineError> {
        self.inner.unblock_contact_boxed(contact_id).await
    }

    pub async fn send_text_status(&self, status: &TextStatus) -> Result<SentStatus, EngineError> {
        self.inner.send_text_status_boxed(status).await
    }

    pub async fn send_image_status(&self, status: &ImageStatus) -> Result<SentStatus, EngineError> {
        self.inner.send_image_status_boxed(status).await
    }

    pub async fn send_voice_status(&self, status: &VoiceStatus) -> Result<SentStatus, EngineError> {
        self.inner.send_voice_status_boxed(status).await
    }

    pub async fn send_video_status(&self, status: &VideoStatus) -> Result<SentStatus, EngineError> {
        self.inner.send_video_status_boxed(status).await
    }

    pub async fn delete_status(&self, request: &DeleteStatusRequest) -> Result<(), EngineError> {
        self.inner.delete_status_boxed(request).await
    }

    pub async fn set_presence(&self, request: &SetPresenceRequest) -> Result<(), EngineError> {
        self.inner.set_presence_boxed(request).await
    }

    pub async fn get_presence(&self, contact_id: &str) -> Result<PresenceInfo, EngineError> {
        self.inner.get_presence_boxed(contact_id).await
    }

    pub async fn subscribe_presence(&self, contact_id: &str) -> Result<(), EngineError> {
        self.inner.subscribe_presence_boxed(contact_id).await
    }

    pub async fn shutdown(&self) {
        self.inner.shutdown_boxed().await
    }
}

impl std::fmt::Debug for BoxClientEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxClientEngine")
            .field("kind", &self.kind())
            .finish()
    }
}
