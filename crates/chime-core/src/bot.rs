//! Bot trait and related types.
//!
//! A [`Bot`] is the dispatch layer's only view of the platform client.
//! Adapters implement it on top of whatever client library they wrap; contexts
//! call it to fetch entities and to answer events.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::model::{Channel, Id, InteractionHandle, Member, Message, MessagePayload};

/// The initial response to an interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum InteractionResponse {
    /// Respond with a new message.
    Message(MessagePayload),
    /// Acknowledge now, send the message later with
    /// [`Bot::edit_original`].
    DeferredMessage { ephemeral: bool },
    /// Edit the message the component is attached to.
    UpdateMessage(MessagePayload),
    /// Acknowledge a component without changing its message.
    DeferredUpdate,
}

/// Handle to whatever a reply produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A message posted in a channel.
    Message(Message),
    /// An interaction response; fetch or edit it through the handle.
    Interaction(InteractionHandle),
}

impl Reply {
    /// Returns the posted message, if the reply was a channel message.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Message(msg) => Some(msg),
            Self::Interaction(_) => None,
        }
    }
}

/// The platform client as seen by handlers.
///
/// All methods are network-bound on a real adapter.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Returns the bot's own user ID.
    fn id(&self) -> Id;

    /// Fetches a channel by ID.
    async fn fetch_channel(&self, channel_id: Id) -> ApiResult<Channel>;

    /// Fetches a user's membership in a guild.
    ///
    /// Returns `Ok(None)` if the user is not a member.
    async fn fetch_member(&self, guild_id: Id, user_id: Id) -> ApiResult<Option<Member>>;

    /// Posts a new message into a channel.
    async fn send_message(&self, channel_id: Id, payload: MessagePayload) -> ApiResult<Message>;

    /// Posts a message as a reply to another message.
    async fn reply_message(&self, message: &Message, payload: MessagePayload)
    -> ApiResult<Message>;

    /// Sends the initial response to an interaction.
    async fn respond(
        &self,
        interaction: &InteractionHandle,
        response: InteractionResponse,
    ) -> ApiResult<()>;

    /// Edits the original interaction response.
    async fn edit_original(
        &self,
        interaction: &InteractionHandle,
        payload: MessagePayload,
    ) -> ApiResult<()>;

    /// Deletes the original interaction response.
    async fn delete_original(&self, interaction: &InteractionHandle) -> ApiResult<()>;

    /// Sends an additional message after the initial response.
    async fn follow_up(
        &self,
        interaction: &InteractionHandle,
        payload: MessagePayload,
    ) -> ApiResult<Message>;

    /// Returns self as an `Arc<dyn Any>` for safe downcasting.
    ///
    /// Implementors should simply return `self`:
    ///
    /// ```rust,ignore
    /// fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
    ///     self
    /// }
    /// ```
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared Bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

/// Downcasts a [`BoxedBot`] to a concrete adapter type.
///
/// Returns `None` if the bot is of a different type.
pub fn downcast_bot<T: Bot>(bot: BoxedBot) -> Option<Arc<T>> {
    Arc::downcast::<T>(bot.as_any()).ok()
}
