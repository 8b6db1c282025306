//! Frame classification and dispatch.
//!
//! Every frame becomes exactly one of: an answer fragment, a citations
//! snapshot, a metrics snapshot, or a termination signal. Structured payloads
//! that fail to decode are reported through [`StreamSink::on_decode_error`]
//! and never stop the stream.

use ragstream_core::{Citation, DecodeError, Metrics};
use tracing::{debug, warn};

use crate::frame::Frame;

/// Label of citations frames.
pub const CITATIONS_EVENT: &str = "citations";
/// Label of metrics frames.
pub const METRICS_EVENT: &str = "metrics";
/// Label of the termination frame.
pub const DONE_EVENT: &str = "done";
/// In-band termination payload, honored under any label.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A classified frame.
#[derive(Debug)]
pub enum StreamEvent {
    /// Text to append to the answer.
    AnswerFragment(String),
    /// Full replacement citations list.
    Citations(Vec<Citation>),
    /// Full replacement metrics record.
    Metrics(Metrics),
    /// The stream is logically complete.
    Terminated,
    /// A structured frame whose payload failed to decode.
    DecodeError {
        /// The offending frame.
        frame: Frame,
        /// Why it failed.
        error: DecodeError,
    },
}

impl StreamEvent {
    /// Check if this is the termination event.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Get the text if this is an answer fragment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::AnswerFragment(text) => Some(text),
            _ => None,
        }
    }
}

/// Result of dispatching one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Keep processing frames.
    Continue,
    /// A termination frame was seen; process nothing further.
    Terminated,
}

impl DispatchOutcome {
    /// Check if the stream terminated.
    #[must_use]
    pub fn is_terminated(self) -> bool {
        self == Self::Terminated
    }
}

/// Receiver of dispatched stream events.
///
/// The answer accumulator is append-only: `on_answer_fragment` is called once
/// per answer frame. Citations and metrics are delivered as full snapshots
/// that replace whatever the sink held before.
pub trait StreamSink {
    /// Append a fragment to the in-flight answer.
    fn on_answer_fragment(&mut self, text: &str);

    /// Replace the citations snapshot.
    fn on_citations(&mut self, citations: Vec<Citation>);

    /// Replace the metrics snapshot.
    fn on_metrics(&mut self, metrics: Metrics);

    /// The stream completed normally.
    fn on_terminate(&mut self);

    /// A structured frame could not be decoded. Existing snapshots must be
    /// left untouched.
    fn on_decode_error(&mut self, frame: &Frame, error: &DecodeError) {
        warn!(
            event = %frame.event,
            payload_len = frame.data.len(),
            error = %error,
            "Dropping undecodable frame"
        );
    }
}

impl<S: StreamSink + ?Sized> StreamSink for &mut S {
    fn on_answer_fragment(&mut self, text: &str) {
        (**self).on_answer_fragment(text);
    }

    fn on_citations(&mut self, citations: Vec<Citation>) {
        (**self).on_citations(citations);
    }

    fn on_metrics(&mut self, metrics: Metrics) {
        (**self).on_metrics(metrics);
    }

    fn on_terminate(&mut self) {
        (**self).on_terminate();
    }

    fn on_decode_error(&mut self, frame: &Frame, error: &DecodeError) {
        (**self).on_decode_error(frame, error);
    }
}

/// Check if a frame signals termination, by label or by sentinel payload.
#[must_use]
pub fn is_termination(frame: &Frame) -> bool {
    frame.event == DONE_EVENT || frame.data.trim() == DONE_SENTINEL
}

/// Classify a frame.
///
/// Returns `None` for answer frames with an empty payload, which are dropped.
pub fn classify(frame: Frame) -> Option<StreamEvent> {
    if is_termination(&frame) {
        return Some(StreamEvent::Terminated);
    }

    if frame.event == CITATIONS_EVENT {
        return Some(match Citation::parse_list(&frame.data) {
            Ok(citations) => StreamEvent::Citations(citations),
            Err(error) => StreamEvent::DecodeError { frame, error },
        });
    }

    if frame.event == METRICS_EVENT {
        return Some(match Metrics::parse(&frame.data) {
            Ok(metrics) => StreamEvent::Metrics(metrics),
            Err(error) => StreamEvent::DecodeError { frame, error },
        });
    }

    if frame.data.is_empty() {
        return None;
    }
    if !frame.is_default_event() {
        debug!(event = %frame.event, "Treating unrecognized event as answer text");
    }
    Some(StreamEvent::AnswerFragment(frame.data))
}

/// Apply a classified event to a sink.
pub fn apply<S: StreamSink + ?Sized>(event: StreamEvent, sink: &mut S) -> DispatchOutcome {
    match event {
        StreamEvent::AnswerFragment(text) => sink.on_answer_fragment(&text),
        StreamEvent::Citations(citations) => sink.on_citations(citations),
        StreamEvent::Metrics(metrics) => sink.on_metrics(metrics),
        StreamEvent::DecodeError { frame, error } => sink.on_decode_error(&frame, &error),
        StreamEvent::Terminated => {
            sink.on_terminate();
            return DispatchOutcome::Terminated;
        }
    }
    DispatchOutcome::Continue
}

/// Classify a frame and apply it to a sink.
pub fn dispatch<S: StreamSink + ?Sized>(frame: Frame, sink: &mut S) -> DispatchOutcome {
    match classify(frame) {
        Some(event) => apply(event, sink),
        None => DispatchOutcome::Continue,
    }
}

/// Dispatch frames in order, stopping at the first termination.
pub fn dispatch_all<S, I>(frames: I, sink: &mut S) -> DispatchOutcome
where
    S: StreamSink + ?Sized,
    I: IntoIterator<Item = Frame>,
{
    for frame in frames {
        if dispatch(frame, sink).is_terminated() {
            return DispatchOutcome::Terminated;
        }
    }
    DispatchOutcome::Continue
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Sink that records every callback as a readable string.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub calls: Vec<String>,
    }

    impl StreamSink for RecordingSink {
        fn on_answer_fragment(&mut self, text: &str) {
            self.calls.push(format!("answer:{text}"));
        }

        fn on_citations(&mut self, citations: Vec<Citation>) {
            let ids: Vec<_> = citations.iter().map(|c| c.id.as_str()).collect();
            self.calls.push(format!("citations:{}", ids.join(",")));
        }

        fn on_metrics(&mut self, metrics: Metrics) {
            self.calls.push(format!("metrics:{}", metrics.to_payload()));
        }

        fn on_terminate(&mut self) {
            self.calls.push("terminate".to_string());
        }

        fn on_decode_error(&mut self, frame: &Frame, error: &DecodeError) {
            self.calls.push(format!("decode_error:{}:{}", frame.event, error.kind()));
        }
    }

    #[rstest]
    #[case(Frame::message("[DONE]"))]
    #[case(Frame::message(" [DONE] "))]
    #[case(Frame::new("done", "[DONE]"))]
    #[case(Frame::new("done", "finished early"))]
    #[case(Frame::new("citations", "[DONE]"))]
    fn test_termination_signals(#[case] frame: Frame) {
        assert!(matches!(classify(frame), Some(StreamEvent::Terminated)));
    }

    #[test]
    fn test_citations_frame() {
        let frame = Frame::new("citations", r#"[{"id":"1","title":"T","snippet":"S"}]"#);
        match classify(frame) {
            Some(StreamEvent::Citations(citations)) => {
                assert_eq!(citations, vec![Citation::new("1", "T", "S")]);
            }
            other => panic!("Expected citations, got {other:?}"),
        }
    }

    #[test]
    fn test_metrics_frame() {
        let frame = Frame::new("metrics", r#"{"latency_ms": 12}"#);
        match classify(frame) {
            Some(StreamEvent::Metrics(metrics)) => assert_eq!(metrics.latency_ms, Some(12.0)),
            other => panic!("Expected metrics, got {other:?}"),
        }
    }

    #[rstest]
    #[case(r#"{"latency_ms":5,"node_history":null}"#)]
    #[case(r#"{"tokens":"12"}"#)]
    #[case(r#"{"node_count":2.0}"#)]
    #[case(r#"{"node_history":[{"node":"x"}]}"#)]
    fn test_loosely_typed_metrics_still_delivered(#[case] payload: &str) {
        let mut sink = RecordingSink::default();
        dispatch(Frame::new("metrics", payload), &mut sink);
        assert_eq!(sink.calls.len(), 1);
        assert!(sink.calls[0].starts_with("metrics:"), "got {:?}", sink.calls);
    }

    #[test]
    fn test_invalid_structured_payload() {
        let frame = Frame::new("citations", "not json");
        match classify(frame.clone()) {
            Some(StreamEvent::DecodeError { frame: bad, error }) => {
                assert_eq!(bad, frame);
                assert_eq!(error.kind(), "citations");
            }
            other => panic!("Expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_label_is_answer_text() {
        let event = classify(Frame::new("error", "upstream failed")).unwrap();
        assert_eq!(event.as_text(), Some("upstream failed"));
    }

    #[test]
    fn test_structured_looking_text_stays_text() {
        let payload = r#"[{"id":"1","title":"T","snippet":"S"}]"#;
        let event = classify(Frame::message(payload)).unwrap();
        assert_eq!(event.as_text(), Some(payload));
    }

    #[test]
    fn test_empty_answer_dropped() {
        assert!(classify(Frame::message("")).is_none());
        assert!(classify(Frame::new("custom", "")).is_none());
    }

    #[test]
    fn test_dispatch_all_stops_at_termination() {
        let mut sink = RecordingSink::default();
        let outcome = dispatch_all(
            vec![
                Frame::message("a"),
                Frame::new("done", "[DONE]"),
                Frame::message("after"),
            ],
            &mut sink,
        );

        assert_eq!(outcome, DispatchOutcome::Terminated);
        assert_eq!(sink.calls, vec!["answer:a", "terminate"]);
    }

    #[test]
    fn test_decode_error_does_not_stop_dispatch() {
        let mut sink = RecordingSink::default();
        let outcome = dispatch_all(
            vec![
                Frame::new("metrics", "{broken"),
                Frame::message("still here"),
            ],
            &mut sink,
        );

        assert_eq!(outcome, DispatchOutcome::Continue);
        assert_eq!(
            sink.calls,
            vec!["decode_error:metrics:metrics", "answer:still here"]
        );
    }

    #[test]
    fn test_sink_by_mutable_reference() {
        let mut sink = RecordingSink::default();
        let mut by_ref = &mut sink;
        dispatch(Frame::message("x"), &mut by_ref);
        assert_eq!(sink.calls, vec!["answer:x"]);
    }
}
