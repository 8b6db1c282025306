//! Answer accumulation.
//!
//! [`AnswerState`] is the stock [`StreamSink`]: it appends answer fragments,
//! keeps the latest citations and metrics snapshots, and remembers whether
//! the stream terminated.

use ragstream_core::{Citation, DecodeError, Metrics};
use tracing::warn;

use crate::dispatch::StreamSink;
use crate::frame::Frame;

/// Default prefix for the error indicator written by [`AnswerState::fail`].
pub const DEFAULT_ERROR_PREFIX: &str = "An error occurred: ";

/// State of one in-flight answer.
#[derive(Debug, Clone, Default)]
pub struct AnswerState {
    answer: String,
    citations: Vec<Citation>,
    metrics: Option<Metrics>,
    terminated: bool,
    failed: bool,
    decode_errors: usize,
    fragments: usize,
}

impl AnswerState {
    /// Create an empty answer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated answer text.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Latest citations snapshot.
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// Latest metrics snapshot.
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Whether a termination frame was seen.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Whether [`fail`](Self::fail) was called.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Number of frames dropped because their payload did not decode.
    pub fn decode_errors(&self) -> usize {
        self.decode_errors
    }

    /// Number of answer fragments applied.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Clear everything for a new question.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Replace the partial answer with an error indicator.
    ///
    /// Snapshots are kept so the evidence received so far stays visible.
    pub fn fail(&mut self, error: &dyn std::fmt::Display, prefix: &str) {
        self.answer = format!("{prefix}{error}");
        self.failed = true;
    }
}

impl StreamSink for AnswerState {
    fn on_answer_fragment(&mut self, text: &str) {
        self.answer.push_str(text);
        self.fragments += 1;
    }

    fn on_citations(&mut self, citations: Vec<Citation>) {
        self.citations = citations;
    }

    fn on_metrics(&mut self, metrics: Metrics) {
        self.metrics = Some(metrics);
    }

    fn on_terminate(&mut self) {
        self.terminated = true;
    }

    fn on_decode_error(&mut self, frame: &Frame, error: &DecodeError) {
        self.decode_errors += 1;
        warn!(
            event = %frame.event,
            error = %error,
            decode_errors = self.decode_errors,
            "Keeping previous snapshot after undecodable frame"
        );
    }
}
