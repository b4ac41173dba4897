//! Error types for the RiakJson client.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by [`Connection`](crate::Connection) and
/// [`Collection`](crate::Collection) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A collection name was empty.
    #[error("invalid collection name: a collection cannot have an empty name")]
    InvalidCollectionName,

    /// A document operation was attempted without a key.
    #[error("document key missing")]
    MissingKey,

    /// A resource URL could not be built from the connection's host and port.
    #[error("invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },

    /// The server answered 404.
    #[error("resource not found: {url}")]
    NotFound { url: String },

    /// A POST insert did not produce a generated key.
    #[error("document not inserted, no key returned (HTTP {status}): {message}")]
    WriteFailure { status: u16, message: String },

    /// Any other non-2xx response.
    #[error("HTTP {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },

    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[from] riakjson_transport::Error),

    /// A response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection backing a collection handle has been dropped.
    #[error("connection closed")]
    ConnectionClosed,

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for errors raised before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidCollectionName | Error::MissingKey)
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
