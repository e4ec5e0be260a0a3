//! Error types for plinth-chat

use thiserror::Error;

/// Result type alias using plinth-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session and store operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire layer
    #[error(transparent)]
    Stream(#[from] plinth_stream::Error),

    /// A turn is already in flight for this conversation
    #[error("A turn is already in flight")]
    TurnInFlight,

    /// Store I/O failed
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted chat data could not be parsed
    #[error("Store format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Referenced chat does not exist
    #[error("Chat not found: {0}")]
    ChatNotFound(String),
}
