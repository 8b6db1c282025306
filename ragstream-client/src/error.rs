//! Client errors.

use ragstream_streaming::StreamError;
use thiserror::Error;

/// Errors that can occur while asking a question.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint answered with a non-success status.
    #[error("HTTP error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The request could not be sent.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The answer stream failed after it started.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if asking again might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => matches!(status, 429 | 500..=599),
            Self::Request(err) => err.is_timeout() || err.is_connect(),
            Self::Stream(err) => err.is_transport(),
            Self::Config(_) => false,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
