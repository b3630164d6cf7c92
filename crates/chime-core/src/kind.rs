//! Kind tags for handlers, commands and components.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a command may be invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationMode {
    /// Structured slash-command interaction.
    #[default]
    Slash,
    /// Free-text message starting with a configured prefix.
    Prefix,
    /// Either of the above.
    Both,
}

impl InvocationMode {
    /// Returns `true` if a command declared with this mode accepts slash invocations.
    pub fn accepts_slash(self) -> bool {
        matches!(self, Self::Slash | Self::Both)
    }

    /// Returns `true` if a command declared with this mode accepts prefix invocations.
    pub fn accepts_prefix(self) -> bool {
        matches!(self, Self::Prefix | Self::Both)
    }
}

/// The UI element variant a component handler answers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    #[default]
    Button,
    StringSelect,
    UserSelect,
    RoleSelect,
    ChannelSelect,
    MentionableSelect,
    Modal,
}

impl ComponentKind {
    /// All kinds, in declaration order.
    pub const ALL: [ComponentKind; 7] = [
        Self::Button,
        Self::StringSelect,
        Self::UserSelect,
        Self::RoleSelect,
        Self::ChannelSelect,
        Self::MentionableSelect,
        Self::Modal,
    ];

    /// Returns the kebab-case name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::StringSelect => "string-select",
            Self::UserSelect => "user-select",
            Self::RoleSelect => "role-select",
            Self::ChannelSelect => "channel-select",
            Self::MentionableSelect => "mentionable-select",
            Self::Modal => "modal",
        }
    }

    /// Returns `true` for the five select-menu kinds.
    pub fn is_select_menu(self) -> bool {
        self.as_str().ends_with("-select")
    }

    /// Maps a platform component type code to a kind.
    ///
    /// Modals are not message components and have no code here; text inputs
    /// (code 4) only appear inside modals.
    pub fn from_component_type(code: u8) -> Option<Self> {
        Some(match code {
            2 => Self::Button,
            3 => Self::StringSelect,
            5 => Self::UserSelect,
            6 => Self::RoleSelect,
            7 => Self::MentionableSelect,
            8 => Self::ChannelSelect,
            _ => return None,
        })
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown component kind '{s}'"))
    }
}

/// Which registry namespace a handler lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Command,
    Component,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => f.write_str("command"),
            Self::Component => f.write_str("component"),
        }
    }
}
