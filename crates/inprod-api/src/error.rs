//! Error types for inprod-api

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the InProd API
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-2xx status code
    #[error("InProd API returned HTTP {status}: {reason}")]
    Transport {
        status: u16,
        reason: String,
        /// Raw response body, kept for diagnostics only
        body: String,
    },

    /// A 2xx response whose body is not valid JSON
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse {
        url: String,
        reason: String,
        body: String,
    },

    /// Change-set payload file could not be read
    #[error("failed to read change set file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connection-level failure (DNS, refused connection, TLS, client timeout)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Token exchange for username/password credentials failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Bad host URL, header value, or HTTP client settings
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// HTTP status code for transport errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;
