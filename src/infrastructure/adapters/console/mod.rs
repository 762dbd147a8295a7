//! Console transport for development/testing
//!
//! Each stdin line becomes an inbound event from the configured chat and
//! sender; outbound payloads are printed.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::domain::entities::{GroupMetadata, InboundEvent, OutgoingContent, Participant, SendOptions};
use crate::domain::traits::{Transport, TransportInfo};
use crate::infrastructure::config::ConsoleConfig;

/// Console transport for local development
pub struct ConsoleTransport {
    config: ConsoleConfig,
    info: TransportInfo,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleTransport {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            info: TransportInfo {
                jid: "bot@s.whatsapp.net".to_string(),
                name: "wa-dispatch".to_string(),
                platform: "console".to_string(),
            },
            config,
            reader: Mutex::new(None),
        }
    }

    fn render(content: &OutgoingContent) -> String {
        match content {
            OutgoingContent::Text(text) => text.clone(),
            OutgoingContent::Image { caption, .. } => {
                format!("[image] {}", caption.as_deref().unwrap_or(""))
            }
            OutgoingContent::Video { caption, .. } => {
                format!("[video] {}", caption.as_deref().unwrap_or(""))
            }
            OutgoingContent::Audio { voice_note, .. } => {
                if *voice_note { "[voice note]".to_string() } else { "[audio]".to_string() }
            }
            OutgoingContent::Sticker { .. } => "[sticker]".to_string(),
            OutgoingContent::Document { file_name, .. } => format!("[document] {}", file_name),
            OutgoingContent::Location { latitude, longitude, name } => format!(
                "[location] {}, {} {}",
                latitude,
                longitude,
                name.as_deref().unwrap_or("")
            ),
            OutgoingContent::Contact { display_name, phone } => {
                format!("[contact] {} ({})", display_name, phone)
            }
            OutgoingContent::Reaction { emoji, .. } => format!("[reaction] {}", emoji),
        }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new(ConsoleConfig::default())
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, BotError> {
        tracing::info!("Starting console transport (dev mode) as {}", self.config.sender);
        let (tx, rx) = mpsc::channel(64);
        let chat_id = self.config.chat_id.clone();
        let sender = self.config.sender.clone();

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        let event = InboundEvent::from_text(&chat_id, &sender, line)
                            .with_push_name("console");
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            tracing::info!("Console input closed");
        });

        *self.reader.lock().unwrap_or_else(|e| e.into_inner()) = Some(reader);
        Ok(rx)
    }

    async fn send_message(
        &self,
        chat_id: &str,
        content: OutgoingContent,
        options: SendOptions,
    ) -> Result<String, BotError> {
        let quoted = options
            .quoted
            .map(|id| format!(" (reply to {})", id))
            .unwrap_or_default();
        println!("[BOT → {}]{} {}", chat_id, quoted, Self::render(&content));
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn group_metadata(&self, chat_id: &str) -> Result<GroupMetadata, BotError> {
        if chat_id != self.config.chat_id || !chat_id.ends_with("@g.us") {
            return Err(BotError::NotFound(format!("group {}", chat_id)));
        }
        Ok(GroupMetadata {
            id: chat_id.to_string(),
            subject: "Console group".to_string(),
            description: None,
            participants: vec![
                Participant { jid: self.config.sender.clone(), is_admin: true },
                Participant { jid: self.info.jid.clone(), is_admin: true },
            ],
        })
    }

    async fn contact_name(&self, jid: &str) -> Result<Option<String>, BotError> {
        Ok((jid == self.config.sender).then(|| "console".to_string()))
    }

    async fn stop(&self) -> Result<(), BotError> {
        if let Some(reader) = self.reader.lock().unwrap_or_else(|e| e.into_inner()).take() {
            reader.abort();
        }
        tracing::info!("Console transport stopped");
        Ok(())
    }

    fn info(&self) -> TransportInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_the_configured_group_has_metadata() {
        let transport = ConsoleTransport::new(ConsoleConfig {
            enabled: true,
            chat_id: "123@g.us".into(),
            sender: "62811@s.whatsapp.net".into(),
        });
        let meta = transport.group_metadata("123@g.us").await.unwrap();
        assert!(meta.is_admin("62811@s.whatsapp.net"));
        assert!(transport.group_metadata("999@g.us").await.is_err());
    }

    #[test]
    fn renders_media_placeholders() {
        let content = OutgoingContent::Reaction { target_id: "X".into(), emoji: "👍".into() };
        assert_eq!(ConsoleTransport::render(&content), "[reaction] 👍");
    }
}
