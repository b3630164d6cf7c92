//! Error types for platform API calls.
//!
//! Dispatch and context errors live in `chime-framework`.

use thiserror::Error;

/// Errors returned by [`Bot`](crate::Bot) API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The bot is not connected.
    #[error("bot is not connected")]
    NotConnected,
    /// The API call timed out.
    #[error("API call timed out")]
    Timeout,
    /// The platform rejected the request.
    #[error("API error ({code}): {message}")]
    Rejected { code: i64, message: String },
    /// The requested entity does not exist or is not visible to the bot.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
