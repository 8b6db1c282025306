//! # ragstream
//!
//! Reconstructs a streamed retrieval-augmented answer on the client side.
//!
//! The answer service streams frames separated by blank lines. Unlabeled
//! frames carry answer tokens; `citations` and `metrics` frames carry JSON
//! snapshots; `done` (or a `[DONE]` payload) ends the stream. ragstream
//! turns that byte stream back into a growing answer string, the latest
//! citations list and the latest metrics record.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ragstream::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ClientError> {
//!     let client = AskClient::from_env()?;
//!     let mut answer = AnswerState::new();
//!     let cancel = CancellationToken::new();
//!
//!     let outcome = client
//!         .ask_answer(&AskRequest::new("What is hybrid search?"), &mut answer, &cancel)
//!         .await?;
//!
//!     println!("{outcome:?}: {}", answer.answer());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|--------|
//! | `client` | HTTP client for the `/ask` endpoint | ✅ |
//!
//! ## Architecture
//!
//! - [`ragstream_core`] - Citation and metrics types
//! - [`ragstream_streaming`] - Frame parser, dispatcher and stream driver
//! - `ragstream_client` - HTTP adapter (feature `client`)

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Core types.
pub use ragstream_core as core;

/// Frame parsing and dispatch.
pub use ragstream_streaming as streaming;

/// HTTP adapter.
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub use ragstream_client as client;

pub use ragstream_core::{Citation, DecodeError, Metrics, NodeRecord};

pub use ragstream_streaming::{
    drive, drive_with_config, AnswerState, DispatchOutcome, EventStream, EventStreamExt, Frame,
    FrameParser, ParserConfig, StreamError, StreamEvent, StreamOutcome, StreamResult,
    StreamSession, StreamSink,
};

#[cfg(feature = "client")]
pub use ragstream_client::{AskClient, AskRequest, ClientConfig, ClientError, ClientResult};

/// Cancellation signal accepted by [`drive`] and the client.
pub use ragstream_streaming::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        drive, AnswerState, CancellationToken, Citation, EventStreamExt, Metrics, StreamEvent,
        StreamOutcome, StreamSink,
    };

    #[cfg(feature = "client")]
    pub use crate::{AskClient, AskRequest, ClientError};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_prelude_drive() {
        let chunks: Vec<Result<&str, std::io::Error>> = vec![
            Ok("event: citations\ndata: [{\"id\":\"1\",\"title\":\"T\",\"snippet\":\"S\"}]\n\n"),
            Ok("data: answer\n\nevent: done\ndata: [DONE]\n\n"),
        ];
        let mut answer = AnswerState::new();
        let outcome = drive(futures::stream::iter(chunks), &mut answer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(answer.answer(), "answer");
        assert_eq!(answer.citations(), &[Citation::new("1", "T", "S")]);
    }
}
