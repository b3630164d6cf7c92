//! Gateway events consumed by the dispatch layer.

use serde::{Deserialize, Serialize};

use crate::model::{Message, RawInteraction};

/// A normalized gateway event.
///
/// Serialized as `{"t": "<EVENT_NAME>", "d": {...}}`, the platform's dispatch
/// envelope, so adapters can forward gateway frames without reshaping them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "d")]
pub enum RawEvent {
    #[serde(rename = "INTERACTION_CREATE")]
    Interaction(RawInteraction),
    #[serde(rename = "MESSAGE_CREATE")]
    Message(Message),
}

impl RawEvent {
    /// Parses an event from a gateway dispatch frame.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Returns the gateway event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Interaction(_) => "INTERACTION_CREATE",
            Self::Message(_) => "MESSAGE_CREATE",
        }
    }
}

impl From<RawInteraction> for RawEvent {
    fn from(interaction: RawInteraction) -> Self {
        Self::Interaction(interaction)
    }
}

impl From<Message> for RawEvent {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}
