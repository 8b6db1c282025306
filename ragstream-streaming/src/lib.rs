//! # ragstream-streaming
//!
//! Incremental parsing of answer streams.
//!
//! An answer stream is a chunked text stream of frames that interleaves
//! answer text with two side channels: citations and metrics. This crate
//! turns that byte stream back into typed events.
//!
//! ## Core Concepts
//!
//! - **[`FrameParser`]**: residual-state parser; chunk boundaries may fall anywhere
//! - **[`classify`] / [`dispatch`]**: map frames to [`StreamEvent`]s and apply them
//! - **[`StreamSink`]**: callbacks receiving answer fragments and snapshots
//! - **[`AnswerState`]**: the stock sink (answer text, citations, metrics)
//! - **[`drive`]**: sequential pull loop over a transport with cancellation
//! - **[`EventStream`]**: the same pipeline as a `futures::Stream`
//!
//! ## Example - Driving a transport
//!
//! ```ignore
//! use ragstream_streaming::{drive, AnswerState, StreamOutcome};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut answer = AnswerState::new();
//! let outcome = drive(response.bytes_stream(), &mut answer, &CancellationToken::new()).await?;
//! if outcome == StreamOutcome::Completed {
//!     println!("{}", answer.answer());
//! }
//! ```
//!
//! ## Example - Manual feeding
//!
//! ```
//! use ragstream_streaming::{AnswerState, StreamSession};
//!
//! let mut answer = AnswerState::new();
//! let mut session = StreamSession::new();
//! session.push_str("data: Hel\n\ndata: l", &mut answer).unwrap();
//! session.push_str("o\n\nevent: done\ndata: [DONE]\n\n", &mut answer).unwrap();
//!
//! assert_eq!(answer.answer(), "Hello");
//! assert!(answer.is_terminated());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod accumulator;
pub mod dispatch;
pub mod error;
pub mod event_stream;
pub mod frame;
pub mod session;
pub mod wire;

// Re-exports
pub use accumulator::{AnswerState, DEFAULT_ERROR_PREFIX};
pub use dispatch::{
    apply, classify, dispatch, dispatch_all, is_termination, DispatchOutcome, StreamEvent,
    StreamSink, CITATIONS_EVENT, DONE_EVENT, DONE_SENTINEL, METRICS_EVENT,
};
pub use error::{BoxError, StreamError, StreamResult};
pub use event_stream::{EventStream, EventStreamExt};
pub use frame::{Frame, FrameParser, ParserConfig, DEFAULT_EVENT};
pub use session::{drive, drive_with_config, StreamOutcome, StreamSession};
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        drive, AnswerState, EventStreamExt, Frame, FrameParser, StreamError, StreamEvent,
        StreamOutcome, StreamResult, StreamSession, StreamSink,
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let parser = FrameParser::new();
        assert!(parser.is_idle());
        assert!(StreamOutcome::Ended.is_finished());
        assert!(!StreamOutcome::Cancelled.is_finished());
    }
}
