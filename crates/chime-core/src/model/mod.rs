//! Normalized platform records.
//!
//! These types are the boundary between the dispatch layer and whatever
//! platform client feeds it. Adapters translate their library's objects into
//! these records (or deserialize them from JSON); nothing in the dispatch
//! layer depends on a specific client library.

pub mod guild;
pub mod interaction;
pub mod message;
pub mod permissions;
pub mod user;

pub use guild::{Channel, ChannelKind, Guild};
pub use interaction::{
    CommandOption, InteractionData, InteractionHandle, InteractionType, ModalField, OptionType,
    OptionValue, RawInteraction, Resolved,
};
pub use message::{Attachment, Message, MessagePayload};
pub use permissions::Permissions;
pub use user::{Member, Role, User};

/// A platform snowflake ID.
pub type Id = u64;
