//! Error types for the chat layer.

use std::fmt;

use deckhand_api::ApiError;

/// Chat layer errors
#[derive(Debug)]
pub enum ChatError {
    /// The messaging front end failed to deliver or edit a message
    Transport(String),
    /// A selection token could not be decoded
    InvalidSelection(String),
    /// Upstream API failure that was not turned into a user-facing reply
    Api(ApiError),
    /// Serialization error
    SerializationError(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::InvalidSelection(data) => write!(f, "Invalid selection token: {}", data),
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ApiError> for ChatError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;
