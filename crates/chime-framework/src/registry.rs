//! Handler declarations and the registry they live in.
//!
//! A declaration is built in two steps: options are collected with
//! [`CommandOptions`] / [`ComponentOptions`], then a builder pairs them with a
//! handler and validates the result into an immutable definition. Definitions
//! are registered once at load time; lookups during dispatch are plain map
//! reads.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use chime_framework::prelude::*;
//!
//! let mut registry = MetadataRegistry::new();
//! registry.register_command(
//!     CommandDefinition::builder(
//!         CommandOptions::new("play", "Play a round")
//!             .mode(InvocationMode::Both)
//!             .user_cooldown(Duration::from_secs(5)),
//!     )
//!     .handler(command_fn(|_bot, ctx: CommandContext| async move {
//!         ctx.reply("let's go").await?;
//!         Ok(())
//!     }))
//!     .build()?,
//! )?;
//! ```

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chime_core::{ComponentKind, HandlerKind, InvocationMode, OptionType, OptionValue, Permissions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DeclarationError;
use crate::handler::{BoxedCommandHandler, BoxedComponentHandler, CommandHandler, ComponentHandler};

/// Longest command or option name.
pub const MAX_NAME_LEN: usize = 32;
/// Longest command or option description.
pub const MAX_DESCRIPTION_LEN: usize = 100;
/// Most options per level, and most choices per option.
pub const MAX_OPTIONS: usize = 25;
/// Longest component custom ID.
pub const MAX_CUSTOM_ID_LEN: usize = 100;

// ============================================================================
// Option schema
// ============================================================================

/// A fixed value the user can pick for an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: OptionValue,
}

/// Declared shape of a slash-command option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub autocomplete: bool,
    /// Nested options; only valid under subcommands and groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
}

impl OptionSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: OptionType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            autocomplete: false,
            options: Vec::new(),
            choices: Vec::new(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn autocomplete(mut self, autocomplete: bool) -> Self {
        self.autocomplete = autocomplete;
        self
    }

    /// Adds a nested option.
    pub fn option(mut self, option: OptionSchema) -> Self {
        self.options.push(option);
        self
    }

    /// Adds a static choice.
    pub fn choice(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_description(&self.description)?;
        if self.autocomplete && !self.choices.is_empty() {
            return Err(format!(
                "option '{}' cannot combine autocomplete with choices",
                self.name
            ));
        }
        if self.choices.len() > MAX_OPTIONS {
            return Err(format!(
                "option '{}' has more than {MAX_OPTIONS} choices",
                self.name
            ));
        }
        if !self.options.is_empty() && !self.kind.is_subcommand() {
            return Err(format!(
                "option '{}' is not a subcommand and cannot have sub-options",
                self.name
            ));
        }
        validate_options(&self.options)
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(format!("name '{name}' must be 1-{MAX_NAME_LEN} characters"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("name '{name}' must not contain whitespace"));
    }
    if name.to_lowercase() != name {
        return Err(format!("name '{name}' must be lowercase"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(format!("description exceeds {MAX_DESCRIPTION_LEN} characters"));
    }
    Ok(())
}

fn validate_options(options: &[OptionSchema]) -> Result<(), String> {
    if options.len() > MAX_OPTIONS {
        return Err(format!("more than {MAX_OPTIONS} options"));
    }
    let mut seen = HashSet::new();
    let mut optional_seen = false;
    for option in options {
        if !seen.insert(option.name.as_str()) {
            return Err(format!("option '{}' is declared twice", option.name));
        }
        if option.required && optional_seen {
            return Err(format!(
                "required option '{}' follows an optional one",
                option.name
            ));
        }
        optional_seen |= !option.required;
        option.validate()?;
    }
    Ok(())
}

/// Cooldowns as integer milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => {
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                serializer.serialize_some(&ms)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

// ============================================================================
// Command declarations
// ============================================================================

/// Declared options of a command.
///
/// Deserializes from `{name, description, type?, user_cooldown?, guild_cooldown?, ...}`
/// with cooldowns in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandOptions {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// How the command may be invoked. Defaults to slash only.
    #[serde(default, rename = "type")]
    pub mode: InvocationMode,
    /// Per-user cooldown.
    #[serde(default, with = "duration_ms")]
    pub user_cooldown: Option<Duration>,
    /// Per-guild cooldown.
    #[serde(default, with = "duration_ms")]
    pub guild_cooldown: Option<Duration>,
    /// Permission the invoking member must hold.
    #[serde(default)]
    pub member_permission: Option<Permissions>,
    #[serde(default)]
    pub options: Vec<OptionSchema>,
}

impl CommandOptions {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            mode: InvocationMode::default(),
            user_cooldown: None,
            guild_cooldown: None,
            member_permission: None,
            options: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: InvocationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn user_cooldown(mut self, duration: Duration) -> Self {
        self.user_cooldown = Some(duration);
        self
    }

    pub fn guild_cooldown(mut self, duration: Duration) -> Self {
        self.guild_cooldown = Some(duration);
        self
    }

    pub fn member_permission(mut self, permission: Permissions) -> Self {
        self.member_permission = Some(permission);
        self
    }

    pub fn option(mut self, option: OptionSchema) -> Self {
        self.options.push(option);
        self
    }

    fn validate(&self) -> Result<(), DeclarationError> {
        validate_name(&self.name)
            .and_then(|()| validate_description(&self.description))
            .and_then(|()| validate_options(&self.options))
            .map_err(|reason| DeclarationError::Invalid {
                kind: HandlerKind::Command,
                identifier: self.name.clone(),
                reason,
            })
    }
}

/// A registered command: its options and handler.
pub struct CommandDefinition {
    options: CommandOptions,
    handler: BoxedCommandHandler,
}

impl CommandDefinition {
    /// Starts a declaration from its options.
    pub fn builder(options: CommandOptions) -> CommandBuilder {
        CommandBuilder {
            options,
            handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn options(&self) -> &CommandOptions {
        &self.options
    }

    pub fn handler(&self) -> &BoxedCommandHandler {
        &self.handler
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builds a [`CommandDefinition`].
pub struct CommandBuilder {
    options: CommandOptions,
    handler: Option<BoxedCommandHandler>,
}

impl CommandBuilder {
    /// Sets the handler.
    pub fn handler(mut self, handler: impl CommandHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sets an already shared handler.
    pub fn handler_arc(mut self, handler: BoxedCommandHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Validates the declaration.
    ///
    /// Fails with [`DeclarationError::MissingExecute`] when no handler was set.
    pub fn build(self) -> Result<CommandDefinition, DeclarationError> {
        let handler = self.handler.ok_or_else(|| DeclarationError::MissingExecute {
            kind: HandlerKind::Command,
            identifier: self.options.name.clone(),
        })?;
        self.options.validate()?;
        Ok(CommandDefinition {
            options: self.options,
            handler,
        })
    }
}

// ============================================================================
// Component declarations
// ============================================================================

/// Declared options of a component handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentOptions {
    /// The custom ID this handler answers to.
    pub id: String,
    /// Component kind. Defaults to button.
    #[serde(default, rename = "type")]
    pub kind: ComponentKind,
    /// Permission the interacting member must hold.
    #[serde(default)]
    pub member_permission: Option<Permissions>,
}

impl ComponentOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ComponentKind::default(),
            member_permission: None,
        }
    }

    pub fn kind(mut self, kind: ComponentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn member_permission(mut self, permission: Permissions) -> Self {
        self.member_permission = Some(permission);
        self
    }

    fn validate(&self) -> Result<(), DeclarationError> {
        let len = self.id.chars().count();
        if len == 0 || len > MAX_CUSTOM_ID_LEN {
            return Err(DeclarationError::Invalid {
                kind: HandlerKind::Component,
                identifier: self.id.clone(),
                reason: format!("custom ID must be 1-{MAX_CUSTOM_ID_LEN} characters"),
            });
        }
        Ok(())
    }
}

/// A registered component handler.
pub struct ComponentDefinition {
    options: ComponentOptions,
    handler: BoxedComponentHandler,
}

impl ComponentDefinition {
    /// Starts a declaration from its options.
    pub fn builder(options: ComponentOptions) -> ComponentBuilder {
        ComponentBuilder {
            options,
            handler: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.options.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.options.kind
    }

    pub fn options(&self) -> &ComponentOptions {
        &self.options
    }

    pub fn handler(&self) -> &BoxedComponentHandler {
        &self.handler
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builds a [`ComponentDefinition`].
pub struct ComponentBuilder {
    options: ComponentOptions,
    handler: Option<BoxedComponentHandler>,
}

impl ComponentBuilder {
    pub fn handler(mut self, handler: impl ComponentHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn handler_arc(mut self, handler: BoxedComponentHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Validates the declaration.
    ///
    /// Fails with [`DeclarationError::MissingExecute`] when no handler was set.
    pub fn build(self) -> Result<ComponentDefinition, DeclarationError> {
        let handler = self.handler.ok_or_else(|| DeclarationError::MissingExecute {
            kind: HandlerKind::Component,
            identifier: self.options.id.clone(),
        })?;
        self.options.validate()?;
        Ok(ComponentDefinition {
            options: self.options,
            handler,
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Lookup table of every declared handler, keyed by kind and identifier.
///
/// Populated at load time and then shared read-only with the dispatcher.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    commands: HashMap<String, Arc<CommandDefinition>>,
    components: HashMap<String, Arc<ComponentDefinition>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command.
    ///
    /// Fails with [`DeclarationError::Duplicate`] if the name is taken.
    pub fn register_command(
        &mut self,
        definition: CommandDefinition,
    ) -> Result<(), DeclarationError> {
        let name = definition.name().to_string();
        if self.commands.contains_key(&name) {
            return Err(DeclarationError::Duplicate {
                kind: HandlerKind::Command,
                identifier: name,
            });
        }
        debug!(command = %name, mode = ?definition.options.mode, "Registered command");
        self.commands.insert(name, Arc::new(definition));
        Ok(())
    }

    /// Registers a component handler.
    ///
    /// Fails with [`DeclarationError::Duplicate`] if the custom ID is taken.
    pub fn register_component(
        &mut self,
        definition: ComponentDefinition,
    ) -> Result<(), DeclarationError> {
        let id = definition.id().to_string();
        if self.components.contains_key(&id) {
            return Err(DeclarationError::Duplicate {
                kind: HandlerKind::Component,
                identifier: id,
            });
        }
        debug!(component = %id, kind = %definition.kind(), "Registered component");
        self.components.insert(id, Arc::new(definition));
        Ok(())
    }

    /// Declares and registers a command in one step.
    pub fn add_command(
        &mut self,
        options: CommandOptions,
        handler: impl CommandHandler,
    ) -> Result<(), DeclarationError> {
        self.register_command(CommandDefinition::builder(options).handler(handler).build()?)
    }

    /// Declares and registers a component handler in one step.
    pub fn add_component(
        &mut self,
        options: ComponentOptions,
        handler: impl ComponentHandler,
    ) -> Result<(), DeclarationError> {
        self.register_component(ComponentDefinition::builder(options).handler(handler).build()?)
    }

    /// Looks up a command by name.
    pub fn command(&self, name: &str) -> Option<Arc<CommandDefinition>> {
        self.commands.get(name).cloned()
    }

    /// Looks up a component handler by custom ID.
    pub fn component(&self, id: &str) -> Option<Arc<ComponentDefinition>> {
        self.components.get(id).cloned()
    }

    /// Iterates over all commands, e.g. for publishing them to the platform.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<CommandDefinition>> {
        self.commands.values()
    }

    /// Iterates over all component handlers.
    pub fn components(&self) -> impl Iterator<Item = &Arc<ComponentDefinition>> {
        self.components.values()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}
