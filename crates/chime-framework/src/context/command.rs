//! Command invocation context.

use std::ops::Deref;

use chime_core::{
    BoxedBot, Channel, CommandOption, InteractionResponse, InvocationMode, Member, Message,
    MessagePayload, OptionType, OptionValue, RawInteraction, Reply, Role, User,
};

use super::ContextBase;
use crate::dispatcher::{EventKind, classify_interaction};
use crate::error::{ContextError, ContextResult, DispatchError, DispatchResult};

/// How a command was invoked. Fixed for the lifetime of a context.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// A slash-command interaction.
    Slash(RawInteraction),
    /// A text message matching a configured prefix.
    Prefix {
        message: Message,
        /// The prefix as it appeared in the message.
        prefix: String,
        /// The command name as the user typed it.
        command_name: String,
    },
}

/// Context for a command handler.
///
/// Slash-only accessors fail with [`ContextError::WrongMode`] on prefix
/// invocations and the other way round.
pub struct CommandContext {
    base: ContextBase,
    invocation: Invocation,
}

impl CommandContext {
    /// Builds a context around a slash-command interaction.
    ///
    /// Component and modal interactions are rejected.
    pub fn from_slash(bot: BoxedBot, interaction: RawInteraction) -> DispatchResult<Self> {
        let kind = classify_interaction(&interaction)?;
        if kind != EventKind::SlashCommand {
            return Err(DispatchError::MalformedEvent(format!(
                "{kind} interaction is not a slash command"
            )));
        }
        let base = ContextBase::new(
            bot,
            interaction.guild.clone(),
            None,
            interaction.channel_id,
            interaction.channel.clone(),
            interaction.user.clone(),
            interaction.member.clone(),
        );
        Ok(Self {
            base,
            invocation: Invocation::Slash(interaction),
        })
    }

    /// Builds a context around a prefix-command message.
    pub fn from_prefix(
        bot: BoxedBot,
        message: Message,
        prefix: impl Into<String>,
        command_name: impl Into<String>,
    ) -> Self {
        let base = ContextBase::new(
            bot,
            None,
            message.guild_id,
            Some(message.channel_id),
            None,
            message.author.clone(),
            message.member.clone(),
        );
        Self {
            base,
            invocation: Invocation::Prefix {
                message,
                prefix: prefix.into(),
                command_name: command_name.into(),
            },
        }
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Returns [`InvocationMode::Slash`] or [`InvocationMode::Prefix`].
    pub fn mode(&self) -> InvocationMode {
        match self.invocation {
            Invocation::Slash(_) => InvocationMode::Slash,
            Invocation::Prefix { .. } => InvocationMode::Prefix,
        }
    }

    pub fn is_slash(&self) -> bool {
        matches!(self.invocation, Invocation::Slash(_))
    }

    pub fn is_prefix(&self) -> bool {
        matches!(self.invocation, Invocation::Prefix { .. })
    }

    /// Returns the interaction of a slash invocation.
    pub fn interaction(&self) -> Option<&RawInteraction> {
        match &self.invocation {
            Invocation::Slash(interaction) => Some(interaction),
            Invocation::Prefix { .. } => None,
        }
    }

    /// Returns the message of a prefix invocation.
    pub fn message(&self) -> Option<&Message> {
        match &self.invocation {
            Invocation::Slash(_) => None,
            Invocation::Prefix { message, .. } => Some(message),
        }
    }

    // ------------------------------------------------------------------------
    // Common operations
    // ------------------------------------------------------------------------

    /// Replies to the invocation.
    ///
    /// Slash commands get an interaction response; prefix commands get a
    /// message reply.
    pub async fn reply(&self, payload: impl Into<MessagePayload>) -> ContextResult<Reply> {
        let payload = payload.into();
        match &self.invocation {
            Invocation::Slash(interaction) => {
                let handle = interaction.handle();
                self.bot()
                    .respond(&handle, InteractionResponse::Message(payload))
                    .await?;
                Ok(Reply::Interaction(handle))
            }
            Invocation::Prefix { message, .. } => {
                let sent = self.bot().reply_message(message, payload).await?;
                Ok(Reply::Message(sent))
            }
        }
    }

    /// Sends a new message to the current channel.
    ///
    /// Fails with [`ContextError::ChannelNotSendable`] if the channel cannot
    /// receive messages.
    pub async fn send(&self, payload: impl Into<MessagePayload>) -> ContextResult<Message> {
        self.base.send_to_channel(payload.into()).await
    }

    /// Resolves the invoking user as a guild member; `None` outside a guild.
    pub async fn member(&self) -> ContextResult<Option<Member>> {
        self.base.member().await
    }

    // ------------------------------------------------------------------------
    // Slash accessors
    // ------------------------------------------------------------------------

    fn slash_interaction(&self, accessor: &'static str) -> ContextResult<&RawInteraction> {
        match &self.invocation {
            Invocation::Slash(interaction) => Ok(interaction),
            Invocation::Prefix { .. } => Err(ContextError::WrongMode {
                accessor,
                expected: "slash",
            }),
        }
    }

    /// Returns the invoked subcommand, if any.
    pub fn subcommand(&self) -> ContextResult<Option<&str>> {
        let options = &self.slash_interaction("subcommand")?.data.options;
        let sub = match options.first() {
            Some(opt) if opt.kind == OptionType::SubCommandGroup => opt.options.first(),
            other => other,
        };
        Ok(sub
            .filter(|opt| opt.kind == OptionType::SubCommand)
            .map(|opt| opt.name.as_str()))
    }

    /// Returns the invoked subcommand group, if any.
    pub fn subcommand_group(&self) -> ContextResult<Option<&str>> {
        let options = &self.slash_interaction("subcommand_group")?.data.options;
        Ok(options
            .first()
            .filter(|opt| opt.kind == OptionType::SubCommandGroup)
            .map(|opt| opt.name.as_str()))
    }

    /// Returns the named option, or `None` if the user did not supply it.
    ///
    /// Options of the invoked subcommand are searched, not the
    /// subcommand entries themselves.
    pub fn option(&self, name: &str) -> ContextResult<Option<ResolvedOption>> {
        let interaction = self.slash_interaction("option")?;
        let found = leaf_options(&interaction.data.options)
            .iter()
            .find(|opt| opt.name == name);
        Ok(found.map(|opt| ResolvedOption::resolve(opt, interaction)))
    }

    /// Returns the top-level options as supplied by the platform.
    pub fn options(&self) -> ContextResult<&[CommandOption]> {
        Ok(&self.slash_interaction("options")?.data.options)
    }

    // ------------------------------------------------------------------------
    // Prefix accessors
    // ------------------------------------------------------------------------

    fn prefix_parts(&self, accessor: &'static str) -> ContextResult<(&Message, &str, &str)> {
        match &self.invocation {
            Invocation::Prefix {
                message,
                prefix,
                command_name,
            } => Ok((message, prefix, command_name)),
            Invocation::Slash(_) => Err(ContextError::WrongMode {
                accessor,
                expected: "prefix",
            }),
        }
    }

    /// Returns the whitespace-separated arguments after the command name.
    pub fn args(&self) -> ContextResult<Vec<String>> {
        let (message, prefix, command_name) = self.prefix_parts("args")?;
        Ok(parse_prefix_args(&message.content, prefix, command_name))
    }

    /// Returns the argument at `index`, or `None` if there are fewer.
    pub fn arg(&self, index: usize) -> ContextResult<Option<String>> {
        self.prefix_parts("arg")?;
        Ok(self.args()?.into_iter().nth(index))
    }

    /// Returns the arguments joined by single spaces.
    pub fn args_string(&self) -> ContextResult<String> {
        self.prefix_parts("args_string")?;
        Ok(self.args()?.join(" "))
    }

    /// Returns the prefix the message used.
    pub fn prefix(&self) -> ContextResult<&str> {
        Ok(self.prefix_parts("prefix")?.1)
    }

    /// Returns the command name as typed.
    pub fn command_name(&self) -> ContextResult<&str> {
        Ok(self.prefix_parts("command_name")?.2)
    }

    /// Parses the prefix arguments into a clap command.
    ///
    /// The command name is used as `argv[0]`; quoting follows shell rules so
    /// `!say "hello world"` yields one argument.
    #[cfg(feature = "command")]
    pub fn parse_args<T: clap::Parser>(&self) -> ContextResult<T> {
        let (message, prefix, command_name) = self.prefix_parts("parse_args")?;
        let rest = strip_invocation(&message.content, prefix, command_name);
        let argv =
            std::iter::once(command_name.to_string()).chain(crate::command::shell_split(rest));
        Ok(T::try_parse_from(argv)?)
    }
}

impl Deref for CommandContext {
    type Target = ContextBase;

    fn deref(&self) -> &ContextBase {
        &self.base
    }
}

/// Returns the options of the innermost invoked subcommand.
fn leaf_options(options: &[CommandOption]) -> &[CommandOption] {
    match options.first() {
        Some(opt) if opt.kind.is_subcommand() => leaf_options(&opt.options),
        _ => options,
    }
}

/// Returns the message text after the prefix and command name, trimmed.
///
/// Skips exactly as many characters as the prefix and command name contain.
fn strip_invocation<'a>(content: &'a str, prefix: &str, command_name: &str) -> &'a str {
    let skip = prefix.chars().count() + command_name.chars().count();
    content
        .char_indices()
        .nth(skip)
        .map_or("", |(idx, _)| &content[idx..])
        .trim()
}

/// Splits a prefix command's arguments.
///
/// ```rust
/// use chime_framework::context::parse_prefix_args;
///
/// assert_eq!(parse_prefix_args("!play rock paper", "!", "play"), ["rock", "paper"]);
/// assert!(parse_prefix_args("!play   ", "!", "play").is_empty());
/// ```
pub fn parse_prefix_args(content: &str, prefix: &str, command_name: &str) -> Vec<String> {
    strip_invocation(content, prefix, command_name)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Resolved options
// ============================================================================

/// A supplied slash-command option.
///
/// [`kind`](Self::kind) always reports the type the platform sent, even after
/// the value is replaced with [`with_value`](Self::with_value).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOption {
    name: String,
    kind: OptionType,
    value: Option<OptionValue>,
    focused: bool,
    user: Option<User>,
    role: Option<Role>,
    channel: Option<Channel>,
}

impl ResolvedOption {
    fn resolve(option: &CommandOption, interaction: &RawInteraction) -> Self {
        let resolved = &interaction.data.resolved;
        let target = option
            .value
            .as_ref()
            .and_then(OptionValue::as_str)
            .and_then(|id| id.parse::<u64>().ok());

        let (user, role, channel) = match (option.kind, target) {
            (OptionType::User | OptionType::Mentionable, Some(id)) => (
                resolved.users.iter().find(|u| u.id == id).cloned(),
                resolved.roles.iter().find(|r| r.id == id).cloned(),
                None,
            ),
            (OptionType::Role, Some(id)) => {
                (None, resolved.roles.iter().find(|r| r.id == id).cloned(), None)
            }
            (OptionType::Channel, Some(id)) => (
                None,
                None,
                resolved.channels.iter().find(|c| c.id == id).cloned(),
            ),
            _ => (None, None, None),
        };

        Self {
            name: option.name.clone(),
            kind: option.kind,
            value: option.value.clone(),
            focused: option.focused,
            user,
            role,
            channel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type reported by the platform.
    pub fn kind(&self) -> OptionType {
        self.kind
    }

    pub fn value(&self) -> Option<&OptionValue> {
        self.value.as_ref()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(OptionValue::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_ref().and_then(OptionValue::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(OptionValue::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(OptionValue::as_bool)
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// The resolved user, for user and mentionable options.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The resolved role, for role and mentionable options.
    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    /// The resolved channel, for channel options.
    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    /// Replaces the value, keeping the reported type.
    pub fn with_value(mut self, value: impl Into<OptionValue>) -> Self {
        self.value = Some(value.into());
        self
    }
}
