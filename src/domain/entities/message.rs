use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// JID suffix used by group conversations.
pub const GROUP_SUFFIX: &str = "@g.us";

/// Textual parts of an inbound message. The transport fills whichever
/// fields the protocol message carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    /// Plain conversation text
    pub conversation: Option<String>,
    /// Extended text (quoted replies, link previews)
    pub extended_text: Option<String>,
    pub image_caption: Option<String>,
    pub video_caption: Option<String>,
    /// Selected button / list row body of an interactive message
    pub interactive_response: Option<String>,
    /// Id of the message this one quotes, if any
    pub quoted_id: Option<String>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            conversation: Some(text.into()),
            ..Default::default()
        }
    }

    /// First populated text field, in protocol priority order.
    pub fn body(&self) -> Option<&str> {
        [
            &self.conversation,
            &self.extended_text,
            &self.image_caption,
            &self.video_caption,
            &self.interactive_response,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.body().is_none()
    }
}

/// An inbound chat event as delivered by the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: String,
    pub chat_id: String,
    pub sender: String,
    pub push_name: Option<String>,
    pub from_me: bool,
    pub timestamp: DateTime<Utc>,
    pub content: MessageContent,
}

impl InboundEvent {
    pub fn new(chat_id: impl Into<String>, sender: impl Into<String>, content: MessageContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string().to_uppercase(),
            chat_id: chat_id.into(),
            sender: sender.into(),
            push_name: None,
            from_me: false,
            timestamp: Utc::now(),
            content,
        }
    }

    pub fn from_text(chat_id: impl Into<String>, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(chat_id, sender, MessageContent::text(text))
    }

    pub fn with_push_name(mut self, name: impl Into<String>) -> Self {
        self.push_name = Some(name.into());
        self
    }

    pub fn with_from_me(mut self, from_me: bool) -> Self {
        self.from_me = from_me;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_group(&self) -> bool {
        self.chat_id.ends_with(GROUP_SUFFIX)
    }

    pub fn text(&self) -> Option<&str> {
        self.content.body()
    }
}

/// Media payload: raw bytes or a location the transport can fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Bytes(Vec<u8>),
    Url(String),
    Path(std::path::PathBuf),
}

/// Outbound message payload
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingContent {
    Text(String),
    Image { media: MediaSource, caption: Option<String> },
    Video { media: MediaSource, caption: Option<String>, gif_playback: bool },
    Audio { media: MediaSource, voice_note: bool },
    Sticker { media: MediaSource },
    Document { media: MediaSource, file_name: String, mimetype: String },
    Location { latitude: f64, longitude: f64, name: Option<String> },
    Contact { display_name: String, phone: String },
    Reaction { target_id: String, emoji: String },
}

impl OutgoingContent {
    pub fn text(text: impl Into<String>) -> Self {
        OutgoingContent::Text(text.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutgoingContent::Text(_) => "text",
            OutgoingContent::Image { .. } => "image",
            OutgoingContent::Video { .. } => "video",
            OutgoingContent::Audio { .. } => "audio",
            OutgoingContent::Sticker { .. } => "sticker",
            OutgoingContent::Document { .. } => "document",
            OutgoingContent::Location { .. } => "location",
            OutgoingContent::Contact { .. } => "contact",
            OutgoingContent::Reaction { .. } => "reaction",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OutgoingContent::Text(s) => Some(s),
            OutgoingContent::Image { caption, .. } | OutgoingContent::Video { caption, .. } => {
                caption.as_deref()
            }
            _ => None,
        }
    }
}

/// Extra delivery options for a send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Message id to quote
    pub quoted: Option<String>,
    /// JIDs mentioned in the text
    pub mentions: Vec<String>,
}

impl SendOptions {
    pub fn quoting(id: impl Into<String>) -> Self {
        Self {
            quoted: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_prefers_conversation_over_captions() {
        let content = MessageContent {
            conversation: Some("!ping".into()),
            image_caption: Some("!sticker".into()),
            ..Default::default()
        };
        assert_eq!(content.body(), Some("!ping"));
    }

    #[test]
    fn body_falls_through_to_interactive_response() {
        let content = MessageContent {
            conversation: Some(String::new()),
            interactive_response: Some("!menu".into()),
            ..Default::default()
        };
        assert_eq!(content.body(), Some("!menu"));
        assert!(MessageContent::default().is_empty());
    }

    #[test]
    fn group_detection_uses_jid_suffix() {
        let group = InboundEvent::from_text("1203630@g.us", "62811@s.whatsapp.net", "hi");
        let direct = InboundEvent::from_text("62811@s.whatsapp.net", "62811@s.whatsapp.net", "hi");
        assert!(group.is_group());
        assert!(!direct.is_group());
    }
}
