use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::{GroupMetadata, InboundEvent, OutgoingContent, SendOptions};

/// Transport trait - abstraction over the chat protocol client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the session and begin streaming inbound events
    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, BotError>;

    /// Send a payload to a chat, returning the transport's message id
    async fn send_message(
        &self,
        chat_id: &str,
        content: OutgoingContent,
        options: SendOptions,
    ) -> Result<String, BotError>;

    /// Fetch group metadata (subject, participants, admins)
    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata, BotError>;

    /// Fetch the display name the network knows for a user
    async fn contact_name(&self, jid: &str) -> Result<Option<String>, BotError>;

    /// Close the session without logging the device out
    async fn stop(&self) -> Result<(), BotError>;

    fn info(&self) -> TransportInfo;
}

/// Identity of the connected account
#[derive(Debug, Clone)]
pub struct TransportInfo {
    pub jid: String,
    pub name: String,
    pub platform: String,
}
