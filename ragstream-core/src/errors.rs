//! Payload decode errors.

use thiserror::Error;

/// A structured frame payload could not be decoded.
///
/// Decode errors are local to a single frame: they never abort the stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Citations payload is not a JSON array of citations.
    #[error("Failed to parse citations: {0}")]
    Citations(#[source] serde_json::Error),

    /// Metrics payload is not a JSON object.
    #[error("Failed to parse metrics: {0}")]
    Metrics(#[source] serde_json::Error),
}

impl DecodeError {
    /// Name of the payload kind that failed to decode.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Citations(_) => "citations",
            Self::Metrics(_) => "metrics",
        }
    }
}

/// Result type for payload decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;
