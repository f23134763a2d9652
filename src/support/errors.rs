//! Error types for the emotion-support service.

use thiserror::Error;

/// Support service error type.
#[derive(Debug, Error)]
pub enum SupportError {
    /// The request cannot be processed as sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Keyword pattern failed to compile.
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for support operations.
pub type SupportResult<T> = Result<T, SupportError>;
