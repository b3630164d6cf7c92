//! Execution contexts handed to handlers.
//!
//! Both context flavors dereference to [`ContextBase`], which owns the bot
//! handle and the guild/channel/member lookups they share.

mod command;
mod component;

pub use command::{CommandContext, Invocation, ResolvedOption, parse_prefix_args};
pub use component::{ComponentContext, ComponentData};

use chime_core::{BoxedBot, Channel, Guild, Id, Member, Message, MessagePayload, User};
use tokio::sync::OnceCell;

use crate::error::{ContextError, ContextResult};

/// Guild, channel and member resolution shared by every context.
pub struct ContextBase {
    bot: BoxedBot,
    guild: Option<Guild>,
    guild_id: Option<Id>,
    channel_id: Option<Id>,
    channel: OnceCell<Channel>,
    user: User,
    member: Option<Member>,
}

impl ContextBase {
    pub(crate) fn new(
        bot: BoxedBot,
        guild: Option<Guild>,
        guild_id: Option<Id>,
        channel_id: Option<Id>,
        channel: Option<Channel>,
        user: User,
        member: Option<Member>,
    ) -> Self {
        let guild_id = guild.as_ref().map(|g| g.id).or(guild_id);
        let channel_id = channel.as_ref().map(|c| c.id).or(channel_id);
        Self {
            bot,
            guild,
            guild_id,
            channel_id,
            channel: OnceCell::new_with(channel),
            user,
            member,
        }
    }

    /// Returns the bot handle.
    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns the guild the event came from, if the adapter resolved it.
    ///
    /// Message events carry only the guild ID; see [`guild_id`](Self::guild_id).
    pub fn guild(&self) -> Option<&Guild> {
        self.guild.as_ref()
    }

    /// Returns the guild ID, or `None` outside a guild.
    pub fn guild_id(&self) -> Option<Id> {
        self.guild_id
    }

    pub fn channel_id(&self) -> Option<Id> {
        self.channel_id
    }

    /// Returns the channel the event came from.
    ///
    /// Fetched through the bot on first use when the event did not carry it;
    /// later calls reuse the result.
    pub async fn channel(&self) -> ContextResult<Option<&Channel>> {
        let Some(channel_id) = self.channel_id else {
            return Ok(None);
        };
        let channel = self
            .channel
            .get_or_try_init(|| async { self.bot.fetch_channel(channel_id).await })
            .await?;
        Ok(Some(channel))
    }

    /// Returns the user who triggered the event.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Resolves the triggering user as a guild member.
    ///
    /// Uses the membership carried by the event when present and fetches it
    /// otherwise. Returns `None` outside a guild.
    pub async fn member(&self) -> ContextResult<Option<Member>> {
        let Some(guild_id) = self.guild_id else {
            return Ok(None);
        };
        if let Some(member) = &self.member {
            return Ok(Some(member.clone()));
        }
        Ok(self.bot.fetch_member(guild_id, self.user.id).await?)
    }

    /// Posts a new message into the event's channel.
    pub(crate) async fn send_to_channel(&self, payload: MessagePayload) -> ContextResult<Message> {
        let channel = self.channel().await?.ok_or(ContextError::NoChannel)?;
        if !channel.is_sendable() {
            return Err(ContextError::ChannelNotSendable {
                channel_id: channel.id,
            });
        }
        Ok(self.bot.send_message(channel.id, payload).await?)
    }
}
