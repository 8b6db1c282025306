//! Streaming errors.

use thiserror::Error;

/// Boxed transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while consuming an answer stream.
///
/// Cancellation is not an error; see [`StreamOutcome::Cancelled`](crate::StreamOutcome).
#[derive(Debug, Error)]
pub enum StreamError {
    /// Reading the next chunk from the transport failed.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The residual held by the parser between chunks grew past the limit.
    #[error("Frame buffer exceeded {limit} bytes")]
    BufferOverflow {
        /// Configured limit in bytes.
        limit: usize,
    },
}

impl StreamError {
    /// Wrap a transport failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Transport(err.into())
    }

    /// Check if the error came from the transport.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
