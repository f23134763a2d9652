//! Error types for the chat client.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(u16),
    /// The auth provider rejected the operation; the text is user facing.
    #[error("{0}")]
    Auth(String),
    /// A configured base URL is not usable.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
