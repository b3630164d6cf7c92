//! Users, guild members and roles.

use serde::{Deserialize, Serialize};

use super::{Id, Permissions};

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    /// Unique account name.
    pub name: String,
    /// Display name, if the user set one.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Whether the account is a bot.
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// Returns the display name, falling back to the account name.
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.name)
    }
}

/// A user's membership in a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    /// Guild-specific nickname.
    #[serde(default)]
    pub nick: Option<String>,
    /// IDs of the roles held by this member.
    #[serde(default)]
    pub roles: Vec<Id>,
    /// Effective permissions in the channel the event came from.
    #[serde(default)]
    pub permissions: Permissions,
}

impl Member {
    /// Returns the nickname, falling back to the user's display name.
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or_else(|| self.user.display_name())
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub permissions: Permissions,
}
