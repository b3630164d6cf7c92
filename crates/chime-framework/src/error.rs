//! Error types for the Chime framework.

use chime_core::{ApiError, ComponentKind, HandlerKind};
use thiserror::Error;

/// A handler declaration that cannot be registered.
///
/// Raised at load time; a process should refuse to start on any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// The declaration has no handler entry point.
    #[error("{kind} '{identifier}' has no execute handler")]
    MissingExecute {
        kind: HandlerKind,
        identifier: String,
    },

    /// Another definition already uses this identifier.
    #[error("{kind} '{identifier}' is already registered")]
    Duplicate {
        kind: HandlerKind,
        identifier: String,
    },

    /// A declared option violates the platform's limits.
    #[error("{kind} '{identifier}': {reason}")]
    Invalid {
        kind: HandlerKind,
        identifier: String,
        reason: String,
    },
}

/// Errors raised by context accessors and operations.
///
/// Guard failures ([`WrongMode`](Self::WrongMode), [`WrongKind`](Self::WrongKind))
/// are programming errors in the handler and are returned immediately.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A slash-only accessor was used on a prefix invocation, or vice versa.
    #[error("'{accessor}' is only available for {expected} commands")]
    WrongMode {
        accessor: &'static str,
        expected: &'static str,
    },

    /// A kind-specific extractor was used on another component kind.
    #[error("'{accessor}' requires a {expected} interaction, got {actual}")]
    WrongKind {
        accessor: &'static str,
        expected: ComponentKind,
        actual: ComponentKind,
    },

    /// The target channel cannot receive messages.
    #[error("channel {channel_id} cannot receive messages")]
    ChannelNotSendable { channel_id: u64 },

    /// The event carries no channel to send to.
    #[error("event has no channel")]
    NoChannel,

    /// The operation is not valid for this interaction.
    #[error("'{operation}' is not supported for {kind} interactions")]
    UnsupportedOperation {
        operation: &'static str,
        kind: ComponentKind,
    },

    /// Prefix arguments did not parse.
    #[cfg(feature = "command")]
    #[error(transparent)]
    InvalidArgs(#[from] clap::Error),

    /// The platform call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors surfaced by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The event's structural tags do not map to a handler kind.
    #[error("unknown interaction kind: {0}")]
    UnknownInteractionKind(String),

    /// The event lacks a field its kind requires, or did not parse.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The handler returned an error.
    #[error("handler '{identifier}' failed: {source}")]
    Handler {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    /// Answering the event (cooldown or permission notice) failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A context operation outside the handler failed for a reason other
    /// than the platform API.
    #[error(transparent)]
    Context(ContextError),
}

impl From<ContextError> for DispatchError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Api(err) => Self::Api(err),
            other => Self::Context(other),
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedEvent(err.to_string())
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
