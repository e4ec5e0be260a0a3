//! Error types for plinth-stream

use thiserror::Error;

/// Result type alias using plinth-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching or reading the chat event stream
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status
    #[error("API error: {status}")]
    Status { status: u16 },

    /// Response carried no readable body
    #[error("No response body")]
    MissingBody,

    /// Request was aborted
    #[error("Request aborted")]
    Aborted,
}

impl Error {
    /// Whether this error came from an explicit abort rather than a failure.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}
