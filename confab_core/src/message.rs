//! Messages and per-conversation history.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::content::{Content, ContentBlock};

/// Who authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Message content: plain text or an ordered block sequence.
///
/// Serializes as a bare JSON string for `Text` and as
/// `{"type": "structured", "blocks": [...]}` for `Structured`, matching
/// the conversation export layout.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text(String),
    Structured(Content),
}

impl MessageBody {
    /// Human-readable rendering of the body.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(content) => content.display_text(),
        }
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Content> for MessageBody {
    fn from(content: Content) -> Self {
        Self::Structured(content)
    }
}

impl Serialize for MessageBody {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Structured(content) => {
                let mut state = serializer.serialize_struct("MessageBody", 2)?;
                state.serialize_field("type", "structured")?;
                state.serialize_field("blocks", content.blocks())?;
                state.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for MessageBody {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Structured {
                #[serde(rename = "type")]
                tag: String,
                blocks: Vec<ContentBlock>,
            },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(text) => Ok(Self::Text(text)),
            Repr::Structured { tag, blocks } if tag == "structured" => {
                Ok(Self::Structured(Content::from_blocks(blocks)))
            }
            Repr::Structured { tag, .. } => Err(serde::de::Error::custom(format!(
                "unknown content type: {tag}"
            ))),
        }
    }
}

/// One immutable dialogue message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    pub content: MessageBody,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: MessageBody) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            timestamp: Utc::now(),
            content,
        }
    }

    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, MessageBody::Text(text.into()))
    }

    #[must_use]
    pub fn structured(role: Role, content: Content) -> Self {
        Self::new(role, MessageBody::Structured(content))
    }

    #[must_use]
    pub fn display_text(&self) -> String {
        self.content.display_text()
    }
}

/// The append-only message log for one conversation id.
///
/// A history is owned by the store that created it; there is exactly one
/// per conversation id at a time. It is created lazily on the first
/// append and destroyed only by explicit eviction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct History {
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub messages: Vec<Message>,
}

impl History {
    #[must_use]
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self::new_at(conversation_id, Utc::now())
    }

    /// Create with an explicit clock reading, so a caller appending the
    /// first message in the same operation can keep
    /// `created_at == updated_at`.
    #[must_use]
    pub fn new_at(conversation_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            created_at: at,
            updated_at: at,
            metadata: None,
            messages: Vec::new(),
        }
    }

    /// Append a message and bump `updated_at`.
    pub fn append(&mut self, message: Message) {
        self.append_at(message, Utc::now());
    }

    /// Append with an explicit clock reading.
    pub fn append_at(&mut self, message: Message, at: DateTime<Utc>) {
        self.messages.push(message);
        self.updated_at = at;
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
