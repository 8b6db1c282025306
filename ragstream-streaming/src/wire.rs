//! Wire encoding.
//!
//! The inverse of [`FrameParser`](crate::FrameParser): renders payloads as
//! frames. Useful for test servers and for replaying recorded streams.

use ragstream_core::{Citation, Metrics};

use crate::dispatch::{CITATIONS_EVENT, DONE_EVENT, DONE_SENTINEL, METRICS_EVENT};
use crate::frame::Frame;

/// Encode a payload as one frame. Each payload line gets its own `data:` line.
pub fn encode(event: Option<&str>, data: &str) -> String {
    let mut out = String::with_capacity(data.len() + 32);
    if let Some(event) = event {
        out.push_str("event: ");
        out.push_str(event);
        out.push('\n');
    }
    for line in data.split('\n') {
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Encode a parsed frame. Unlabeled frames are written without `event:`.
pub fn encode_frame(frame: &Frame) -> String {
    let event = (!frame.is_default_event()).then_some(frame.event.as_str());
    encode(event, &frame.data)
}

/// Encode an answer fragment.
pub fn encode_answer(text: &str) -> String {
    encode(None, text)
}

/// Encode a citations snapshot.
pub fn encode_citations(citations: &[Citation]) -> String {
    encode(Some(CITATIONS_EVENT), &Citation::to_payload(citations))
}

/// Encode a metrics snapshot.
pub fn encode_metrics(metrics: &Metrics) -> String {
    encode(Some(METRICS_EVENT), &metrics.to_payload())
}

/// Encode the termination frame.
pub fn encode_done() -> String {
    encode(Some(DONE_EVENT), DONE_SENTINEL)
}
