//! In-memory bot and event fixtures for tests.
//!
//! Enabled by the `testing` feature.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::bot::{Bot, InteractionResponse};
use crate::error::{ApiError, ApiResult};
use crate::model::{
    Channel, ChannelKind, CommandOption, Guild, Id, InteractionData, InteractionHandle,
    InteractionType, Member, Message, MessagePayload, ModalField, Permissions, RawInteraction,
    User,
};

/// Bot user ID used by [`RecordingBot`].
pub const BOT_ID: Id = 1;
/// Guild ID used by the fixtures.
pub const GUILD_ID: Id = 100;
/// Text channel ID used by the fixtures.
pub const CHANNEL_ID: Id = 200;
/// Invoking user ID used by the fixtures.
pub const USER_ID: Id = 300;

/// A call made against a [`RecordingBot`].
#[derive(Debug, Clone, PartialEq)]
pub enum BotCall {
    FetchChannel(Id),
    FetchMember { guild_id: Id, user_id: Id },
    SendMessage { channel_id: Id, payload: MessagePayload },
    ReplyMessage { message_id: Id, payload: MessagePayload },
    Respond { interaction_id: Id, response: InteractionResponse },
    EditOriginal { interaction_id: Id, payload: MessagePayload },
    DeleteOriginal { interaction_id: Id },
    FollowUp { interaction_id: Id, payload: MessagePayload },
}

/// A [`Bot`] that answers from preset data and records every call.
///
/// Starts with one sendable text channel, [`CHANNEL_ID`], in [`GUILD_ID`].
pub struct RecordingBot {
    channels: Mutex<HashMap<Id, Channel>>,
    members: Mutex<HashMap<(Id, Id), Member>>,
    calls: Mutex<Vec<BotCall>>,
    failure: Mutex<Option<ApiError>>,
    next_message_id: AtomicU64,
}

impl RecordingBot {
    pub fn new() -> Self {
        let bot = Self {
            channels: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            next_message_id: AtomicU64::new(1000),
        };
        bot.add_channel(text_channel(CHANNEL_ID));
        bot
    }

    /// Adds or replaces a channel returned by `fetch_channel`.
    pub fn add_channel(&self, channel: Channel) {
        self.channels.lock().insert(channel.id, channel);
    }

    /// Adds a member returned by `fetch_member`.
    pub fn add_member(&self, guild_id: Id, member: Member) {
        self.members.lock().insert((guild_id, member.user.id), member);
    }

    /// Returns all recorded calls in order.
    pub fn calls(&self) -> Vec<BotCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded calls and clears the log.
    pub fn take_calls(&self) -> Vec<BotCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Makes every later send, reply and respond call fail with `err`.
    ///
    /// The calls are still recorded.
    pub fn fail_with(&self, err: ApiError) {
        *self.failure.lock() = Some(err);
    }

    fn record(&self, call: BotCall) {
        self.calls.lock().push(call);
    }

    fn check_failure(&self) -> ApiResult<()> {
        match self.failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn posted(&self, channel_id: Id, payload: &MessagePayload) -> Message {
        Message {
            id: self.next_message_id.fetch_add(1, Ordering::Relaxed),
            channel_id,
            guild_id: self.channels.lock().get(&channel_id).and_then(|c| c.guild_id),
            author: User {
                id: BOT_ID,
                name: "chime".into(),
                global_name: None,
                bot: true,
            },
            member: None,
            content: payload.content.clone().unwrap_or_default(),
            attachments: Vec::new(),
        }
    }
}

impl Default for RecordingBot {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    fn id(&self) -> Id {
        BOT_ID
    }

    async fn fetch_channel(&self, channel_id: Id) -> ApiResult<Channel> {
        self.record(BotCall::FetchChannel(channel_id));
        self.channels
            .lock()
            .get(&channel_id)
            .cloned()
            .ok_or(ApiError::NotFound {
                entity: "channel",
                id: channel_id,
            })
    }

    async fn fetch_member(&self, guild_id: Id, user_id: Id) -> ApiResult<Option<Member>> {
        self.record(BotCall::FetchMember { guild_id, user_id });
        Ok(self.members.lock().get(&(guild_id, user_id)).cloned())
    }

    async fn send_message(&self, channel_id: Id, payload: MessagePayload) -> ApiResult<Message> {
        let msg = self.posted(channel_id, &payload);
        self.record(BotCall::SendMessage { channel_id, payload });
        self.check_failure()?;
        Ok(msg)
    }

    async fn reply_message(
        &self,
        message: &Message,
        payload: MessagePayload,
    ) -> ApiResult<Message> {
        let msg = self.posted(message.channel_id, &payload);
        self.record(BotCall::ReplyMessage {
            message_id: message.id,
            payload,
        });
        self.check_failure()?;
        Ok(msg)
    }

    async fn respond(
        &self,
        interaction: &InteractionHandle,
        response: InteractionResponse,
    ) -> ApiResult<()> {
        self.record(BotCall::Respond {
            interaction_id: interaction.id,
            response,
        });
        self.check_failure()
    }

    async fn edit_original(
        &self,
        interaction: &InteractionHandle,
        payload: MessagePayload,
    ) -> ApiResult<()> {
        self.record(BotCall::EditOriginal {
            interaction_id: interaction.id,
            payload,
        });
        Ok(())
    }

    async fn delete_original(&self, interaction: &InteractionHandle) -> ApiResult<()> {
        self.record(BotCall::DeleteOriginal {
            interaction_id: interaction.id,
        });
        Ok(())
    }

    async fn follow_up(
        &self,
        interaction: &InteractionHandle,
        payload: MessagePayload,
    ) -> ApiResult<Message> {
        let msg = self.posted(CHANNEL_ID, &payload);
        self.record(BotCall::FollowUp {
            interaction_id: interaction.id,
            payload,
        });
        Ok(msg)
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A non-bot user.
pub fn user(id: Id, name: &str) -> User {
    User {
        id,
        name: name.into(),
        global_name: None,
        bot: false,
    }
}

/// A guild member with the given permissions.
pub fn member(user: User, permissions: Permissions) -> Member {
    Member {
        user,
        nick: None,
        roles: Vec::new(),
        permissions,
    }
}

/// The fixture guild.
pub fn guild() -> Guild {
    Guild {
        id: GUILD_ID,
        name: "test guild".into(),
        owner_id: None,
    }
}

/// A sendable text channel in the fixture guild.
pub fn text_channel(id: Id) -> Channel {
    Channel {
        id,
        name: Some("general".into()),
        kind: ChannelKind::GuildText,
        guild_id: Some(GUILD_ID),
    }
}

/// A guild text message from [`USER_ID`] in [`CHANNEL_ID`].
pub fn message(content: &str) -> Message {
    let author = user(USER_ID, "alice");
    Message {
        id: 500,
        channel_id: CHANNEL_ID,
        guild_id: Some(GUILD_ID),
        member: Some(member(author.clone(), Permissions::NONE)),
        author,
        content: content.into(),
        attachments: Vec::new(),
    }
}

fn interaction(kind: InteractionType, data: InteractionData) -> RawInteraction {
    let invoker = user(USER_ID, "alice");
    RawInteraction {
        id: 900,
        token: "interaction-token".into(),
        kind,
        guild: Some(guild()),
        channel_id: Some(CHANNEL_ID),
        channel: None,
        member: Some(member(invoker.clone(), Permissions::NONE)),
        user: invoker,
        message: None,
        data,
    }
}

/// A slash-command interaction from [`USER_ID`] in the fixture guild.
pub fn slash(name: &str, options: Vec<CommandOption>) -> RawInteraction {
    interaction(
        InteractionType::ApplicationCommand,
        InteractionData {
            name: Some(name.into()),
            options,
            ..Default::default()
        },
    )
}

/// A message-component interaction with the given component type code.
pub fn component(custom_id: &str, component_type: u8) -> RawInteraction {
    interaction(
        InteractionType::MessageComponent,
        InteractionData {
            custom_id: Some(custom_id.into()),
            component_type: Some(component_type),
            ..Default::default()
        },
    )
}

/// A modal submission carrying the given fields.
pub fn modal(custom_id: &str, fields: Vec<ModalField>) -> RawInteraction {
    interaction(
        InteractionType::ModalSubmit,
        InteractionData {
            custom_id: Some(custom_id.into()),
            fields,
            ..Default::default()
        },
    )
}

/// Removes guild information, turning a fixture into a direct-message event.
pub fn without_guild(mut interaction: RawInteraction) -> RawInteraction {
    interaction.guild = None;
    interaction.member = None;
    interaction
}
