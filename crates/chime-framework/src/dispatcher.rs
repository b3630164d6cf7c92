//! Event dispatcher.
//!
//! The [`Dispatcher`] takes a raw event and runs it through a fixed pipeline:
//!
//! 1. [`classify`] the event by its structural tags
//! 2. Look up the handler definition (unknown identifiers are ignored)
//! 3. Build the matching context
//! 4. Check the declared member permission
//! 5. Check cooldowns; when active, reply with the handler's cooldown notice
//! 6. Run the handler and, on success, refresh its cooldowns
//!
//! ```rust,ignore
//! use chime_framework::{Dispatcher, MetadataRegistry};
//!
//! let dispatcher = Dispatcher::new(registry).with_prefixes(["!", "?"]);
//! let outcome = dispatcher.dispatch(bot, event).await?;
//! ```
//!
//! `Dispatcher` also implements `tower::Service<DispatchRequest>` so tower
//! middleware (timeouts, concurrency limits) can wrap it.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use chime_core::{
    BoxedBot, ComponentKind, InteractionType, Member, Message, Permissions, RawEvent,
    RawInteraction,
};
use futures::future::BoxFuture;
use tower::Service;
use tracing::{Instrument, debug, debug_span, trace, warn};

use crate::context::{CommandContext, ComponentContext};
use crate::cooldown::{CooldownScope, CooldownTracker};
use crate::error::{DispatchError, DispatchResult};
use crate::registry::{CommandDefinition, MetadataRegistry};

// ============================================================================
// Classification
// ============================================================================

/// What an event asks the dispatcher to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A slash-command interaction.
    SlashCommand,
    /// A text message that may hold a prefix command.
    PrefixCommand,
    /// A component interaction or modal submission.
    Component(ComponentKind),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlashCommand => f.write_str("slash-command"),
            Self::PrefixCommand => f.write_str("prefix-command"),
            Self::Component(kind) => write!(f, "component:{kind}"),
        }
    }
}

/// Places an event by its gateway name, interaction type and component type.
///
/// Fails with [`DispatchError::UnknownInteractionKind`] for interactions no
/// handler kind covers (pings, autocomplete, unknown codes).
pub fn classify(event: &RawEvent) -> DispatchResult<EventKind> {
    match event {
        RawEvent::Message(_) => Ok(EventKind::PrefixCommand),
        RawEvent::Interaction(interaction) => classify_interaction(interaction),
    }
}

/// Places an interaction by its interaction type and component type.
pub fn classify_interaction(interaction: &RawInteraction) -> DispatchResult<EventKind> {
    match interaction.kind {
        InteractionType::ApplicationCommand => Ok(EventKind::SlashCommand),
        InteractionType::ModalSubmit => Ok(EventKind::Component(ComponentKind::Modal)),
        InteractionType::MessageComponent => {
            let code = interaction.data.component_type.ok_or_else(|| {
                DispatchError::MalformedEvent("component interaction without component_type".into())
            })?;
            ComponentKind::from_component_type(code)
                .map(EventKind::Component)
                .ok_or_else(|| {
                    DispatchError::UnknownInteractionKind(format!("component type {code}"))
                })
        }
        other => Err(DispatchError::UnknownInteractionKind(format!(
            "interaction type {}",
            u8::from(other)
        ))),
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// The result of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler applies: unknown identifier, wrong mode or kind, no prefix.
    Ignored,
    /// The invoker lacks the declared permission; the notice was sent.
    MissingPermission,
    /// The invoker is on cooldown; the notice was sent.
    CoolingDown { remaining_ms: u64, expires_at: u64 },
    /// The handler ran and returned `Ok`.
    Executed,
}

#[derive(Clone)]
struct DispatcherInner {
    registry: Arc<MetadataRegistry>,
    cooldowns: CooldownTracker,
    prefixes: Vec<String>,
    ignore_bots: bool,
}

/// Routes events to registered handlers.
///
/// Cheap to clone; clones share the registry and cooldown state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Creates a dispatcher with no prefixes, so only slash commands and
    /// components are dispatched until [`with_prefixes`](Self::with_prefixes)
    /// is called.
    pub fn new(registry: MetadataRegistry) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry: Arc::new(registry),
                cooldowns: CooldownTracker::new(),
                prefixes: Vec::new(),
                ignore_bots: true,
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut DispatcherInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Sets the message prefixes that introduce prefix commands.
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner_mut().prefixes = prefixes
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        self
    }

    /// Replaces the cooldown tracker, e.g. to share one or inject a clock.
    pub fn with_cooldowns(mut self, cooldowns: CooldownTracker) -> Self {
        self.inner_mut().cooldowns = cooldowns;
        self
    }

    /// Sets whether messages from other bots are ignored. Defaults to `true`.
    pub fn ignore_bots(mut self, ignore: bool) -> Self {
        self.inner_mut().ignore_bots = ignore;
        self
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.inner.registry
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.inner.cooldowns
    }

    pub fn prefixes(&self) -> &[String] {
        &self.inner.prefixes
    }

    /// Dispatches one event.
    ///
    /// Handler errors are returned as [`DispatchError::Handler`] with the
    /// original error as source.
    pub async fn dispatch(
        &self,
        bot: BoxedBot,
        event: RawEvent,
    ) -> DispatchResult<DispatchOutcome> {
        let kind = classify(&event)?;
        let span = debug_span!("dispatch", event = event.event_name(), kind = %kind);

        async move {
            match (kind, event) {
                (EventKind::SlashCommand, RawEvent::Interaction(interaction)) => {
                    self.dispatch_slash(bot, interaction).await
                }
                (EventKind::Component(kind), RawEvent::Interaction(interaction)) => {
                    self.dispatch_component(bot, interaction, kind).await
                }
                (EventKind::PrefixCommand, RawEvent::Message(message)) => {
                    self.dispatch_prefix(bot, message).await
                }
                (kind, event) => Err(DispatchError::MalformedEvent(format!(
                    "{} classified as {kind}",
                    event.event_name()
                ))),
            }
        }
        .instrument(span)
        .await
    }

    /// Parses a gateway frame and dispatches it.
    pub async fn dispatch_json(
        &self,
        bot: BoxedBot,
        json: &str,
    ) -> DispatchResult<DispatchOutcome> {
        let event = RawEvent::from_json(json)?;
        self.dispatch(bot, event).await
    }

    async fn dispatch_slash(
        &self,
        bot: BoxedBot,
        interaction: RawInteraction,
    ) -> DispatchResult<DispatchOutcome> {
        let name = interaction.data.name.clone().ok_or_else(|| {
            DispatchError::MalformedEvent("command interaction without a name".into())
        })?;
        let Some(definition) = self.inner.registry.command(&name) else {
            trace!(command = %name, "Unknown command, ignoring");
            return Ok(DispatchOutcome::Ignored);
        };
        if !definition.options().mode.accepts_slash() {
            trace!(command = %name, "Command is not a slash command, ignoring");
            return Ok(DispatchOutcome::Ignored);
        }

        let ctx = CommandContext::from_slash(bot.clone(), interaction)?;
        self.run_command(bot, &definition, ctx).await
    }

    async fn dispatch_prefix(
        &self,
        bot: BoxedBot,
        message: Message,
    ) -> DispatchResult<DispatchOutcome> {
        if message.author.id == bot.id() || (self.inner.ignore_bots && message.author.bot) {
            trace!(author = message.author.id, "Message from a bot, ignoring");
            return Ok(DispatchOutcome::Ignored);
        }
        let Some((prefix, typed_name)) = self.match_prefix(&message.content) else {
            return Ok(DispatchOutcome::Ignored);
        };
        let (prefix, typed_name) = (prefix.to_string(), typed_name.to_string());

        let Some(definition) = self.inner.registry.command(&typed_name.to_lowercase()) else {
            trace!(command = %typed_name, "Unknown command, ignoring");
            return Ok(DispatchOutcome::Ignored);
        };
        if !definition.options().mode.accepts_prefix() {
            trace!(command = %typed_name, "Command is not a prefix command, ignoring");
            return Ok(DispatchOutcome::Ignored);
        }

        let ctx = CommandContext::from_prefix(bot.clone(), message, prefix, typed_name);
        self.run_command(bot, &definition, ctx).await
    }

    /// Finds the longest configured prefix the message starts with, and the
    /// word directly after it.
    fn match_prefix<'a>(&self, content: &'a str) -> Option<(&'a str, &'a str)> {
        let prefix_len = self
            .inner
            .prefixes
            .iter()
            .filter(|p| content.starts_with(p.as_str()))
            .map(String::len)
            .max()?;
        let (prefix, rest) = content.split_at(prefix_len);
        let name = rest.split(char::is_whitespace).next().filter(|n| !n.is_empty())?;
        Some((prefix, name))
    }

    async fn run_command(
        &self,
        bot: BoxedBot,
        definition: &CommandDefinition,
        ctx: CommandContext,
    ) -> DispatchResult<DispatchOutcome> {
        let name = definition.name();
        let options = definition.options();
        let handler = definition.handler();

        if let Some(required) = options.member_permission {
            if !holds(ctx.member().await?, required) {
                warn!(command = name, user = ctx.user().id, ?required, "Missing member permission");
                let notice = handler.missing_permission(&bot, &ctx, required).await;
                ctx.reply(notice).await?;
                return Ok(DispatchOutcome::MissingPermission);
            }
        }

        let user_id = ctx.user().id;
        let guild_id = ctx.guild_id();
        let cooldowns = &self.inner.cooldowns;

        let remaining_ms = cooldowns.remaining(name, user_id, guild_id);
        if remaining_ms > 0 {
            let expires_at = cooldowns.now_ms() + remaining_ms;
            debug!(command = name, user = user_id, remaining_ms, "Command on cooldown");
            let notice = handler.cooldown(&bot, &ctx, expires_at).await;
            ctx.reply(notice).await?;
            return Ok(DispatchOutcome::CoolingDown {
                remaining_ms,
                expires_at,
            });
        }

        debug!(command = name, mode = ?ctx.mode(), "Executing command");
        handler
            .execute(bot, ctx)
            .await
            .map_err(|source| DispatchError::Handler {
                identifier: name.to_string(),
                source,
            })?;

        cooldowns.refresh(CooldownScope::User, name, user_id, options.user_cooldown);
        if let Some(guild_id) = guild_id {
            cooldowns.refresh(CooldownScope::Guild, name, guild_id, options.guild_cooldown);
        }
        Ok(DispatchOutcome::Executed)
    }

    async fn dispatch_component(
        &self,
        bot: BoxedBot,
        interaction: RawInteraction,
        kind: ComponentKind,
    ) -> DispatchResult<DispatchOutcome> {
        let id = interaction.data.custom_id.clone().ok_or_else(|| {
            DispatchError::MalformedEvent("component interaction without a custom_id".into())
        })?;
        let Some(definition) = self.inner.registry.component(&id) else {
            trace!(component = %id, "Unknown component, ignoring");
            return Ok(DispatchOutcome::Ignored);
        };
        if definition.kind() != kind {
            debug!(
                component = %id,
                declared = %definition.kind(),
                received = %kind,
                "Component kind mismatch, ignoring"
            );
            return Ok(DispatchOutcome::Ignored);
        }

        let ctx = ComponentContext::new(bot.clone(), interaction)?;
        let handler = definition.handler();

        if let Some(required) = definition.options().member_permission {
            if !holds(ctx.member().await?, required) {
                warn!(
                    component = %id,
                    user = ctx.user().id,
                    ?required,
                    "Missing member permission"
                );
                let notice = handler.missing_permission(&bot, &ctx, required).await;
                ctx.reply(notice).await?;
                return Ok(DispatchOutcome::MissingPermission);
            }
        }

        debug!(component = %id, "Executing component handler");
        handler
            .execute(bot, ctx)
            .await
            .map_err(|source| DispatchError::Handler {
                identifier: id,
                source,
            })?;
        Ok(DispatchOutcome::Executed)
    }
}

/// Outside a guild there is no member, so any requirement fails.
fn holds(member: Option<Member>, required: Permissions) -> bool {
    member.is_some_and(|m| m.permissions.allows(required))
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.inner.registry.command_count())
            .field("components", &self.inner.registry.component_count())
            .field("prefixes", &self.inner.prefixes)
            .finish()
    }
}

// ============================================================================
// Tower Service Implementation
// ============================================================================

/// A request for the dispatcher's `tower::Service` implementation.
pub struct DispatchRequest {
    pub bot: BoxedBot,
    pub event: RawEvent,
}

impl DispatchRequest {
    pub fn new(bot: BoxedBot, event: impl Into<RawEvent>) -> Self {
        Self {
            bot,
            event: event.into(),
        }
    }
}

impl Service<DispatchRequest> for Dispatcher {
    type Response = DispatchOutcome;
    type Error = DispatchError;
    type Future = BoxFuture<'static, DispatchResult<DispatchOutcome>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: DispatchRequest) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { dispatcher.dispatch(request.bot, request.event).await })
    }
}
