//! Unified error types for docmirror.
//!
//! Every variant maps onto the HTTP status the gateway answers with, so a
//! failed lookup never needs more than `http_status()` and `to_string()`.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the store, fetcher, documents and gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Path absent after all fallback names were tried.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Network or transport failure talking to the origin.
    #[error("FETCH_ERROR: {0}")]
    Fetch(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Store(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Request denied by the document's policy (host not whitelisted).
    #[error("BLOCKED: {0}")]
    Blocked(String),

    /// Stored row could not be encoded or decoded (compression, header JSON).
    #[error("CODEC_ERROR: {0}")]
    Codec(String),

    /// Malformed document configuration.
    #[error("CONFIGURATION_ERROR: {0}")]
    Configuration(String),

    /// A redirect target that cannot be mapped onto the local gateway.
    #[error("INVALID_REDIRECT: {0}")]
    InvalidRedirect(String),

    /// Zip archive could not be read.
    #[error("ARCHIVE_ERROR: {0}")]
    Archive(String),

    /// Local filesystem failure.
    #[error("IO_ERROR: {0}")]
    Io(String),
}

impl Error {
    /// Status code the gateway responds with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Blocked(_) => 403,
            Error::Fetch(_) => 502,
            _ => 500,
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Store(tokio_rusqlite::Error::Close(c)),
            _ => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Store(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(tokio_rusqlite::Error::Error(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(err: crate::config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}
