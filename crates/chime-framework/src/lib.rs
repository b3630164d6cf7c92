//! # Chime Framework
//!
//! Typed command and component dispatch for chat bots.
//!
//! This layer provides:
//! - A registry of declared handlers ([`MetadataRegistry`])
//! - Typed contexts for commands and components ([`CommandContext`],
//!   [`ComponentContext`])
//! - Per-user and per-guild cooldowns ([`CooldownTracker`])
//! - The [`Dispatcher`] that ties them together, usable as a tower `Service`
//! - Clap-parsed prefix arguments (with the `command` feature)

pub mod context;
pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;

#[cfg(feature = "command")]
pub mod command;

pub use context::{
    CommandContext, ComponentContext, ComponentData, ContextBase, Invocation, ResolvedOption,
};
pub use cooldown::{Clock, CooldownScope, CooldownTracker, ManualClock, SystemClock};
pub use dispatcher::{
    DispatchOutcome, DispatchRequest, Dispatcher, EventKind, classify, classify_interaction,
};
pub use error::{ContextError, ContextResult, DeclarationError, DispatchError, DispatchResult};
pub use handler::{
    BoxedCommandHandler, BoxedComponentHandler, CommandHandler, ComponentHandler, command_fn,
    component_fn,
};
pub use registry::{
    CommandBuilder, CommandDefinition, CommandOptions, ComponentBuilder, ComponentDefinition,
    ComponentOptions, MetadataRegistry, OptionChoice, OptionSchema,
};

/// Prelude for handler authors.
pub mod prelude {
    pub use super::context::{CommandContext, ComponentContext, ComponentData};
    pub use super::error::{ContextError, ContextResult};
    pub use super::handler::{CommandHandler, ComponentHandler, command_fn, component_fn};
    pub use super::registry::{
        CommandDefinition, CommandOptions, ComponentDefinition, ComponentOptions,
        MetadataRegistry, OptionSchema,
    };
    pub use chime_core::prelude::*;
}
