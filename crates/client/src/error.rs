//! Client error types.

use thiserror::Error;

/// Errors from calls to a peer service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid upstream URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("client configuration error: {0}")]
    Config(String),

    #[error("{op}: transport error: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{op}: upstream returned {status}: {body}")]
    Status {
        op: &'static str,
        status: u16,
        body: String,
    },

    #[error("{op}: invalid response: {reason}")]
    Decode { op: &'static str, reason: String },
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
