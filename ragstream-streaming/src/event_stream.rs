//! Stream adapter over a byte transport.
//!
//! [`EventStream`] exposes the parse-and-classify pipeline as a
//! `Stream<Item = StreamResult<StreamEvent>>` for callers that prefer to
//! pull events rather than supply a [`StreamSink`](crate::StreamSink).

use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::dispatch::{classify, StreamEvent};
use crate::error::{BoxError, StreamError, StreamResult};
use crate::frame::{Frame, FrameParser, ParserConfig};

pin_project! {
    /// Stream adapter that parses and classifies frames from a byte stream.
    ///
    /// The stream ends right after yielding [`StreamEvent::Terminated`], after
    /// a transport error, or when the transport ends.
    pub struct EventStream<S> {
        #[pin]
        inner: S,
        parser: FrameParser,
        pending: VecDeque<StreamEvent>,
        overflow: Option<StreamError>,
        terminated: bool,
        finished: bool,
    }
}

impl<S> EventStream<S> {
    /// Create a new event stream from a byte stream.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, ParserConfig::default())
    }

    /// Create a new event stream with the given parser config.
    pub fn with_config(inner: S, config: ParserConfig) -> Self {
        Self {
            inner,
            parser: FrameParser::with_config(config),
            pending: VecDeque::new(),
            overflow: None,
            terminated: false,
            finished: false,
        }
    }
}

// Queue classified frames, dropping everything after a termination.
fn enqueue(
    frames: impl IntoIterator<Item = Frame>,
    pending: &mut VecDeque<StreamEvent>,
    terminated: &mut bool,
) {
    for frame in frames {
        if *terminated {
            return;
        }
        if let Some(event) = classify(frame) {
            *terminated = event.is_terminal();
            pending.push_back(event);
        }
    }
}

impl<S, B, E> Stream for EventStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
    type Item = StreamResult<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            // Return queued events first
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            if let Some(error) = this.overflow.take() {
                return Poll::Ready(Some(Err(error)));
            }

            if *this.finished || *this.terminated {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let mut frames = Vec::new();
                    let fed = this.parser.feed_into(chunk.as_ref(), &mut frames);
                    enqueue(frames, this.pending, this.terminated);
                    if let Err(error) = fed {
                        // Events completed by the chunk are yielded first.
                        *this.finished = true;
                        if !*this.terminated {
                            *this.overflow = Some(error);
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(StreamError::transport(e))));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    enqueue(this.parser.flush(), this.pending, this.terminated);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Extension trait for turning byte streams into event streams.
pub trait EventStreamExt: Sized {
    /// Parse and classify frames from this byte stream.
    fn answer_events(self) -> EventStream<Self> {
        EventStream::new(self)
    }
}

impl<S, B, E> EventStreamExt for S
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use pretty_assertions::assert_eq;

    type Chunk = Result<&'static str, std::io::Error>;

    fn describe(event: &StreamEvent) -> String {
        match event {
            StreamEvent::AnswerFragment(text) => format!("answer:{text}"),
            StreamEvent::Citations(list) => format!("citations:{}", list.len()),
            StreamEvent::Metrics(_) => "metrics".to_string(),
            StreamEvent::Terminated => "terminated".to_string(),
            StreamEvent::DecodeError { error, .. } => format!("decode_error:{}", error.kind()),
        }
    }

    async fn collect(chunks: Vec<Chunk>) -> Vec<String> {
        stream::iter(chunks)
            .answer_events()
            .map(|event| describe(&event.unwrap()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_event_stream_basic() {
        let events = collect(vec![
            Ok("data: Hel\n\nda"),
            Ok("ta: lo\n\nevent: citations\ndata: []\n\nevent: metrics\ndata: {}\n\n"),
            Ok("event: done\ndata: [DONE]\n\ndata: after\n\n"),
        ])
        .await;

        assert_eq!(
            events,
            vec!["answer:Hel", "answer:lo", "citations:0", "metrics", "terminated"]
        );
    }

    #[tokio::test]
    async fn test_event_stream_flushes_trailing_frame() {
        let events = collect(vec![Ok("event: metrics\ndata: oops")]).await;
        assert_eq!(events, vec!["decode_error:metrics"]);
    }

    #[tokio::test]
    async fn test_event_stream_transport_error() {
        let mut events = stream::iter(vec![
            Ok("data: one\n\n"),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe")),
            Ok("data: two\n\n"),
        ])
        .answer_events();

        assert_eq!(events.next().await.unwrap().unwrap().as_text(), Some("one"));
        assert!(events.next().await.unwrap().unwrap_err().is_transport());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_event_stream_overflow_after_completed_events() {
        let mut events = EventStream::with_config(
            stream::iter(vec![Chunk::Ok("data: a\n\ndata: 0123456789abcdefghij")]),
            ParserConfig::new().max_buffer_size(16),
        );

        assert_eq!(events.next().await.unwrap().unwrap().as_text(), Some("a"));
        assert!(matches!(
            events.next().await.unwrap(),
            Err(StreamError::BufferOverflow { limit: 16 })
        ));
        assert!(events.next().await.is_none());
    }

    #[test]
    fn test_event_stream_blocking() {
        let events = stream::iter(vec![Chunk::Ok("data: x\n\n")]).answer_events();
        let collected: Vec<_> = tokio_test::block_on(events.collect::<Vec<_>>());
        assert_eq!(collected.len(), 1);
    }
}
