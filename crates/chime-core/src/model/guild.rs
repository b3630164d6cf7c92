//! Guilds and channels.

use serde::{Deserialize, Serialize};

use super::Id;

/// A guild (server) the bot is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<Id>,
}

/// Channel variants reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildAnnouncement,
    AnnouncementThread,
    PublicThread,
    PrivateThread,
    GuildStageVoice,
    GuildForum,
    GuildMedia,
}

impl ChannelKind {
    /// Returns `true` if messages can be posted directly into this channel.
    ///
    /// Categories hold no messages; forum and media channels only accept
    /// new threads.
    pub fn is_sendable(self) -> bool {
        !matches!(
            self,
            Self::GuildCategory | Self::GuildForum | Self::GuildMedia
        )
    }
}

/// A channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Id,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: ChannelKind,
    #[serde(default)]
    pub guild_id: Option<Id>,
}

impl Channel {
    /// Returns `true` if the channel can receive messages.
    pub fn is_sendable(&self) -> bool {
        self.kind.is_sendable()
    }
}
