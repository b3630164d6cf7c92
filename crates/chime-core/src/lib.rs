//! # Chime Core
//!
//! Platform-neutral building blocks for the Chime dispatch framework.
//!
//! - **Model**: normalized records adapters produce from platform payloads
//!   ([`RawInteraction`], [`Message`], [`Member`], ...)
//! - **Events**: the gateway envelope consumed by the dispatcher ([`RawEvent`])
//! - **Kinds**: invocation modes and component kinds ([`InvocationMode`],
//!   [`ComponentKind`])
//! - **Bot**: the platform client abstraction ([`Bot`], [`BoxedBot`])
//!
//! Nothing here depends on a specific client library. An adapter implements
//! [`Bot`] and feeds [`RawEvent`]s to the dispatcher in `chime-framework`.

pub mod bot;
pub mod error;
pub mod event;
pub mod kind;
pub mod model;

#[cfg(feature = "testing")]
pub mod testing;

pub use bot::{Bot, BoxedBot, InteractionResponse, Reply, downcast_bot};
pub use error::{ApiError, ApiResult};
pub use event::RawEvent;
pub use kind::{ComponentKind, HandlerKind, InvocationMode};
pub use model::{
    Attachment, Channel, ChannelKind, CommandOption, Guild, Id, InteractionData,
    InteractionHandle, InteractionType, Member, Message, MessagePayload, ModalField, OptionType,
    OptionValue, Permissions, RawInteraction, Resolved, Role, User,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::bot::{Bot, BoxedBot, InteractionResponse, Reply};
    pub use super::kind::{ComponentKind, InvocationMode};
    pub use super::model::{Member, Message, MessagePayload, OptionType, OptionValue, Permissions};
}
