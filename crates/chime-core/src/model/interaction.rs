//! Normalized interaction records.
//!
//! A [`RawInteraction`] is what an adapter hands to the dispatch layer. It
//! keeps the platform's structural tags ([`InteractionType`], the numeric
//! component type) untouched so that classification can reject anything it
//! does not understand instead of the adapter guessing.

use serde::{Deserialize, Serialize};

use super::{Attachment, Channel, Guild, Id, Member, Message, Role, User};

// ============================================================================
// Structural tags
// ============================================================================

/// The top-level interaction type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
    /// A code this crate does not know about.
    Unknown(u8),
}

impl From<u8> for InteractionType {
    fn from(code: u8) -> Self {
        match code {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }
}

impl From<InteractionType> for u8 {
    fn from(kind: InteractionType) -> Self {
        match kind {
            InteractionType::Ping => 1,
            InteractionType::ApplicationCommand => 2,
            InteractionType::MessageComponent => 3,
            InteractionType::Autocomplete => 4,
            InteractionType::ModalSubmit => 5,
            InteractionType::Unknown(code) => code,
        }
    }
}

/// The value type of a slash-command option, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum OptionType {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
}

impl OptionType {
    /// Returns `true` for subcommand and subcommand-group options.
    pub fn is_subcommand(self) -> bool {
        matches!(self, Self::SubCommand | Self::SubCommandGroup)
    }
}

impl TryFrom<u8> for OptionType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Self::SubCommand,
            2 => Self::SubCommandGroup,
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            other => return Err(format!("unknown option type code {other}")),
        })
    }
}

impl From<OptionType> for u8 {
    fn from(kind: OptionType) -> Self {
        kind as u8
    }
}

// ============================================================================
// Command options
// ============================================================================

/// A scalar option value.
///
/// User, channel, role and mentionable options carry the target's ID as a
/// string, matching the platform's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// An option supplied with a slash-command invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default)]
    pub value: Option<OptionValue>,
    /// Set while the user is typing into an autocomplete option.
    #[serde(default)]
    pub focused: bool,
    /// Nested options, for subcommands and groups.
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

// ============================================================================
// Modal fields
// ============================================================================

/// A submitted modal field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModalField {
    /// A text input.
    Text { custom_id: String, value: String },
    /// A file upload.
    File {
        custom_id: String,
        #[serde(default)]
        attachment: Option<Attachment>,
    },
}

impl ModalField {
    pub fn custom_id(&self) -> &str {
        match self {
            Self::Text { custom_id, .. } | Self::File { custom_id, .. } => custom_id,
        }
    }
}

// ============================================================================
// Interaction record
// ============================================================================

/// Entities resolved by the platform for select menus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

/// The type-specific payload of an interaction.
///
/// Every field is optional: which ones are populated depends on the
/// interaction and component type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionData {
    /// Command name (application commands).
    #[serde(default)]
    pub name: Option<String>,
    /// Supplied options (application commands).
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// Developer-defined identifier (components and modals).
    #[serde(default)]
    pub custom_id: Option<String>,
    /// Component type code (message components).
    #[serde(default)]
    pub component_type: Option<u8>,
    /// Selected option values (string selects).
    #[serde(default)]
    pub values: Vec<String>,
    /// Selected entities (user/role/channel/mentionable selects).
    #[serde(default)]
    pub resolved: Resolved,
    /// Submitted fields (modals).
    #[serde(default)]
    pub fields: Vec<ModalField>,
}

/// Identifies an interaction for follow-up API calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionHandle {
    pub id: Id,
    pub token: String,
}

/// An interaction exactly as the adapter received it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInteraction {
    pub id: Id,
    pub token: String,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    /// The guild, when the adapter could resolve it from its cache.
    #[serde(default)]
    pub guild: Option<Guild>,
    #[serde(default)]
    pub channel_id: Option<Id>,
    /// The channel, when the adapter already had it.
    #[serde(default)]
    pub channel: Option<Channel>,
    pub user: User,
    #[serde(default)]
    pub member: Option<Member>,
    /// The message a component was attached to.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: InteractionData,
}

impl RawInteraction {
    /// Returns the handle used to answer this interaction.
    pub fn handle(&self) -> InteractionHandle {
        InteractionHandle {
            id: self.id,
            token: self.token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_interaction_type_is_preserved() {
        let kind: InteractionType = serde_json::from_str("42").unwrap();
        assert_eq!(kind, InteractionType::Unknown(42));
        assert_eq!(u8::from(kind), 42);
    }

    #[test]
    fn test_option_value_untagged() {
        let opt: CommandOption =
            serde_json::from_str(r#"{"name": "count", "type": 4, "value": 3}"#).unwrap();
        assert_eq!(opt.kind, OptionType::Integer);
        assert_eq!(opt.value, Some(OptionValue::Integer(3)));

        let opt: CommandOption =
            serde_json::from_str(r#"{"name": "ratio", "type": 10, "value": 0.5}"#).unwrap();
        assert_eq!(opt.value.and_then(|v| v.as_f64()), Some(0.5));
    }

    #[test]
    fn test_unknown_option_type_rejected() {
        let result: Result<CommandOption, _> =
            serde_json::from_str(r#"{"name": "x", "type": 99}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_modal_field_tagging() {
        let field: ModalField = serde_json::from_str(
            r#"{"type": "file", "custom_id": "avatar",
                "attachment": {"id": 1, "filename": "pic.png"}}"#,
        )
        .unwrap();
        assert_eq!(field.custom_id(), "avatar");
        assert!(matches!(field, ModalField::File { attachment: Some(_), .. }));
    }
}
