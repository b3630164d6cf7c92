//! Handler traits and closure adapters.
//!
//! A handler unit pairs declared options (see [`registry`](crate::registry))
//! with one of the traits below. Implement the trait directly when the handler
//! carries state or customizes its notices, or wrap an async closure with
//! [`command_fn`] / [`component_fn`].
//!
//! ```rust,ignore
//! use chime_framework::prelude::*;
//!
//! let ping = command_fn(|_bot, ctx: CommandContext| async move {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! });
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chime_core::{BoxedBot, MessagePayload, Permissions};

use crate::context::{CommandContext, ComponentContext};

/// Entry point of a command handler.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Runs the command.
    ///
    /// Returning `Ok` refreshes the invoker's cooldowns; errors are passed
    /// through to the caller of the dispatcher unchanged.
    async fn execute(&self, bot: BoxedBot, ctx: CommandContext) -> anyhow::Result<()>;

    /// Builds the reply sent while the invoker is on cooldown.
    ///
    /// `expires_at` is the Unix timestamp in milliseconds at which the
    /// cooldown ends.
    async fn cooldown(
        &self,
        _bot: &BoxedBot,
        _ctx: &CommandContext,
        expires_at: u64,
    ) -> MessagePayload {
        MessagePayload::text(format!(
            "This command is on cooldown. Try again <t:{}:R>.",
            expires_at.div_ceil(1000)
        ))
        .ephemeral(true)
    }

    /// Builds the reply sent when the invoker lacks the declared permission.
    async fn missing_permission(
        &self,
        _bot: &BoxedBot,
        _ctx: &CommandContext,
        _required: Permissions,
    ) -> MessagePayload {
        MessagePayload::text("You do not have permission to use this command.").ephemeral(true)
    }
}

/// Entry point of a component handler.
#[async_trait]
pub trait ComponentHandler: Send + Sync + 'static {
    /// Handles the interaction.
    async fn execute(&self, bot: BoxedBot, ctx: ComponentContext) -> anyhow::Result<()>;

    /// Builds the reply sent when the user lacks the declared permission.
    async fn missing_permission(
        &self,
        _bot: &BoxedBot,
        _ctx: &ComponentContext,
        _required: Permissions,
    ) -> MessagePayload {
        MessagePayload::text("You do not have permission to use this.").ephemeral(true)
    }
}

/// A shared command handler.
pub type BoxedCommandHandler = Arc<dyn CommandHandler>;

/// A shared component handler.
pub type BoxedComponentHandler = Arc<dyn ComponentHandler>;

// ============================================================================
// Closure adapters
// ============================================================================

/// A command handler backed by an async closure.
///
/// Created by [`command_fn`].
pub struct CommandFn<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

/// Wraps an async closure as a [`CommandHandler`] with the default notices.
pub fn command_fn<F, Fut>(f: F) -> CommandFn<F, Fut>
where
    F: Fn(BoxedBot, CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    CommandFn {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> CommandHandler for CommandFn<F, Fut>
where
    F: Fn(BoxedBot, CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn execute(&self, bot: BoxedBot, ctx: CommandContext) -> anyhow::Result<()> {
        (self.f)(bot, ctx).await
    }
}

/// A component handler backed by an async closure.
///
/// Created by [`component_fn`].
pub struct ComponentFn<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

/// Wraps an async closure as a [`ComponentHandler`] with the default notice.
pub fn component_fn<F, Fut>(f: F) -> ComponentFn<F, Fut>
where
    F: Fn(BoxedBot, ComponentContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    ComponentFn {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> ComponentHandler for ComponentFn<F, Fut>
where
    F: Fn(BoxedBot, ComponentContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn execute(&self, bot: BoxedBot, ctx: ComponentContext) -> anyhow::Result<()> {
        (self.f)(bot, ctx).await
    }
}
