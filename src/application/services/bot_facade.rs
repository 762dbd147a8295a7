//! Bot facade - the surface command handlers talk to
//!
//! All sends go through the session's [`SendQueue`], so a handler never
//! talks to the transport directly.

use std::sync::Arc;
use std::time::Instant;

use crate::application::errors::BotError;
use crate::application::services::{CommandRegistry, MetadataCache, SendQueue};
use crate::domain::entities::{GroupMetadata, InboundEvent, MediaSource, OutgoingContent, SendOptions};
use crate::domain::traits::{Store, Transport, TransportInfo};
use crate::infrastructure::config::SharedConfig;

#[derive(Clone)]
pub struct BotFacade {
    transport: Arc<dyn Transport>,
    queue: Arc<SendQueue>,
    metadata: Arc<MetadataCache>,
    registry: Arc<CommandRegistry>,
    config: SharedConfig,
    store: Option<Arc<dyn Store>>,
    started_at: Instant,
}

impl BotFacade {
    pub fn new(
        transport: Arc<dyn Transport>,
        queue: Arc<SendQueue>,
        metadata: Arc<MetadataCache>,
        registry: Arc<CommandRegistry>,
        config: SharedConfig,
    ) -> Self {
        Self {
            transport,
            queue,
            metadata,
            registry,
            config,
            store: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Queue a payload for `chat_id` and wait for the transport's answer.
    pub async fn send_message(
        &self,
        chat_id: &str,
        content: OutgoingContent,
        options: SendOptions,
    ) -> Result<String, BotError> {
        let transport = self.transport.clone();
        let chat = chat_id.to_string();
        let kind = content.kind();

        let result = self
            .queue
            .enqueue(move || async move { transport.send_message(&chat, content, options).await })
            .await;

        if let Err(e) = &result {
            tracing::error!(chat = %chat_id, kind, "send failed: {}", e);
        }
        result
    }

    /// Send into the event's chat, quoting the event
    pub async fn reply(&self, event: &InboundEvent, content: OutgoingContent) -> Result<String, BotError> {
        self.send_message(&event.chat_id, content, SendOptions::quoting(&event.id))
            .await
    }

    pub async fn reply_text(&self, event: &InboundEvent, text: impl Into<String>) -> Result<String, BotError> {
        self.reply(event, OutgoingContent::text(text)).await
    }

    pub async fn send_image(&self, chat_id: &str, media: MediaSource, caption: Option<String>) -> Result<String, BotError> {
        self.send_message(chat_id, OutgoingContent::Image { media, caption }, SendOptions::default())
            .await
    }

    pub async fn send_video(&self, chat_id: &str, media: MediaSource, caption: Option<String>) -> Result<String, BotError> {
        let content = OutgoingContent::Video { media, caption, gif_playback: false };
        self.send_message(chat_id, content, SendOptions::default()).await
    }

    pub async fn send_audio(&self, chat_id: &str, media: MediaSource, voice_note: bool) -> Result<String, BotError> {
        self.send_message(chat_id, OutgoingContent::Audio { media, voice_note }, SendOptions::default())
            .await
    }

    pub async fn send_sticker(&self, chat_id: &str, media: MediaSource) -> Result<String, BotError> {
        self.send_message(chat_id, OutgoingContent::Sticker { media }, SendOptions::default())
            .await
    }

    pub async fn send_document(
        &self,
        chat_id: &str,
        media: MediaSource,
        file_name: impl Into<String>,
        mimetype: impl Into<String>,
    ) -> Result<String, BotError> {
        let content = OutgoingContent::Document {
            media,
            file_name: file_name.into(),
            mimetype: mimetype.into(),
        };
        self.send_message(chat_id, content, SendOptions::default()).await
    }

    pub async fn send_location(
        &self,
        chat_id: &str,
        latitude: f64,
        longitude: f64,
        name: Option<String>,
    ) -> Result<String, BotError> {
        let content = OutgoingContent::Location { latitude, longitude, name };
        self.send_message(chat_id, content, SendOptions::default()).await
    }

    pub async fn send_contact(
        &self,
        chat_id: &str,
        display_name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Result<String, BotError> {
        let content = OutgoingContent::Contact {
            display_name: display_name.into(),
            phone: phone.into(),
        };
        self.send_message(chat_id, content, SendOptions::default()).await
    }

    /// React to an inbound message with an emoji
    pub async fn react(&self, event: &InboundEvent, emoji: impl Into<String>) -> Result<String, BotError> {
        let content = OutgoingContent::Reaction {
            target_id: event.id.clone(),
            emoji: emoji.into(),
        };
        self.send_message(&event.chat_id, content, SendOptions::default()).await
    }

    pub async fn group_metadata(&self, chat_id: &str) -> Option<GroupMetadata> {
        self.metadata.group_metadata(chat_id).await
    }

    pub async fn contact_name(&self, jid: &str) -> Option<String> {
        self.metadata.contact_name(jid).await
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&Arc<dyn Store>> {
        self.store.as_ref()
    }

    pub fn queue(&self) -> &SendQueue {
        &self.queue
    }

    pub fn transport_info(&self) -> TransportInfo {
        self.transport.info()
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}
