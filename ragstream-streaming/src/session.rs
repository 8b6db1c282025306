//! Stream sessions.
//!
//! A [`StreamSession`] couples one [`FrameParser`] with the dispatcher for
//! the lifetime of a single stream. [`drive`] runs the sequential pull loop
//! over a transport: request a chunk, parse it, dispatch every frame it
//! completed, then request the next one.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::dispatch::{dispatch, dispatch_all, DispatchOutcome, StreamSink};
use crate::error::{BoxError, StreamError, StreamResult};
use crate::frame::{FrameParser, ParserConfig};

/// How a driven stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// A termination frame was dispatched.
    Completed,
    /// The transport ended without a termination frame.
    Ended,
    /// The caller cancelled before the stream finished.
    Cancelled,
}

impl StreamOutcome {
    /// Check if the stream ran to a natural end.
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Ended)
    }
}

/// Parser and dispatcher state for one stream.
#[derive(Debug, Default)]
pub struct StreamSession {
    parser: FrameParser,
    terminated: bool,
    chunks: usize,
}

impl StreamSession {
    /// Create a new session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with the given parser config.
    #[must_use]
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            parser: FrameParser::with_config(config),
            ..Self::default()
        }
    }

    /// Whether a termination frame was dispatched.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Number of chunks pushed so far.
    #[must_use]
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Parse a byte chunk and dispatch every frame it completes.
    ///
    /// Once terminated, further chunks are ignored. Frames the chunk
    /// completed are dispatched before a residual overflow is reported.
    pub fn push<S>(&mut self, chunk: &[u8], sink: &mut S) -> StreamResult<DispatchOutcome>
    where
        S: StreamSink + ?Sized,
    {
        if self.terminated {
            return Ok(DispatchOutcome::Terminated);
        }
        self.chunks += 1;
        let mut frames = Vec::new();
        let fed = self.parser.feed_into(chunk, &mut frames);
        trace!(chunk = self.chunks, bytes = chunk.len(), frames = frames.len(), "Parsed chunk");

        let outcome = self.record(dispatch_all(frames, sink));
        if outcome.is_terminated() {
            return Ok(outcome);
        }
        fed?;
        Ok(outcome)
    }

    /// Parse a text chunk and dispatch every frame it completes.
    pub fn push_str<S>(&mut self, chunk: &str, sink: &mut S) -> StreamResult<DispatchOutcome>
    where
        S: StreamSink + ?Sized,
    {
        self.push(chunk.as_bytes(), sink)
    }

    /// End of stream: dispatch the flushed trailing frame, if any.
    pub fn finish<S>(&mut self, sink: &mut S) -> DispatchOutcome
    where
        S: StreamSink + ?Sized,
    {
        if self.terminated {
            return DispatchOutcome::Terminated;
        }
        match self.parser.flush() {
            Some(frame) => {
                let outcome = dispatch(frame, sink);
                self.record(outcome)
            }
            None => DispatchOutcome::Continue,
        }
    }

    fn record(&mut self, outcome: DispatchOutcome) -> DispatchOutcome {
        if outcome.is_terminated() {
            self.terminated = true;
            self.parser.clear();
        }
        outcome
    }
}

/// Drive a transport to completion with the default parser config.
///
/// See [`drive_with_config`].
pub async fn drive<T, B, E, S>(
    transport: T,
    sink: &mut S,
    cancel: &CancellationToken,
) -> StreamResult<StreamOutcome>
where
    T: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
    S: StreamSink + ?Sized,
{
    drive_with_config(transport, sink, cancel, ParserConfig::default()).await
}

/// Drive a transport to completion.
///
/// Chunks are requested one at a time; every frame of a chunk is dispatched
/// before the next chunk is requested. Cancellation is checked before each
/// request and wins over a ready chunk. On cancellation no trailing frame is
/// flushed and [`StreamSink::on_terminate`] is not called.
///
/// A transport error ends the loop with [`StreamError::Transport`]; fragments
/// already dispatched stay in the sink.
pub async fn drive_with_config<T, B, E, S>(
    transport: T,
    sink: &mut S,
    cancel: &CancellationToken,
    config: ParserConfig,
) -> StreamResult<StreamOutcome>
where
    T: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
    S: StreamSink + ?Sized,
{
    futures::pin_mut!(transport);
    let mut session = StreamSession::with_config(config);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(chunks = session.chunks(), "Stream cancelled");
                return Ok(StreamOutcome::Cancelled);
            }
            next = transport.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                if session.push(chunk.as_ref(), sink)?.is_terminated() {
                    debug!(chunks = session.chunks(), "Stream completed");
                    return Ok(StreamOutcome::Completed);
                }
            }
            Some(Err(err)) => {
                let err = StreamError::transport(err);
                debug!(chunks = session.chunks(), error = %err, "Stream failed");
                return Err(err);
            }
            None => {
                let outcome = if session.finish(sink).is_terminated() {
                    StreamOutcome::Completed
                } else {
                    StreamOutcome::Ended
                };
                debug!(chunks = session.chunks(), ?outcome, "Transport ended");
                return Ok(outcome);
            }
        }
    }
}
