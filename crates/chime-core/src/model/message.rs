//! Messages, attachments and outgoing message payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Id, Member, User};

/// A file attached to a message or uploaded through a modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Id,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A message posted in a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Id,
    pub channel_id: Id,
    #[serde(default)]
    pub guild_id: Option<Id>,
    pub author: User,
    /// Author's guild membership, present for guild messages.
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Outgoing message content.
///
/// Embeds and components are kept as raw JSON: their schema belongs to the
/// platform adapter, not to the dispatch layer.
///
/// # Example
///
/// ```rust
/// use chime_core::MessagePayload;
///
/// let payload = MessagePayload::text("pong").ephemeral(true);
/// assert_eq!(payload.content.as_deref(), Some("pong"));
/// assert!(payload.ephemeral);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Value>,
    /// Only the invoking user sees the message. Ignored for plain channel
    /// messages.
    #[serde(default)]
    pub ephemeral: bool,
}

impl MessagePayload {
    /// Creates a payload with text content only.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Sets the ephemeral flag.
    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    /// Appends an embed.
    pub fn embed(mut self, embed: Value) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Appends a component row.
    pub fn component(mut self, component: Value) -> Self {
        self.components.push(component);
        self
    }
}

impl From<&str> for MessagePayload {
    fn from(content: &str) -> Self {
        Self::text(content)
    }
}

impl From<String> for MessagePayload {
    fn from(content: String) -> Self {
        Self::text(content)
    }
}
