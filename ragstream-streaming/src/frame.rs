//! Incremental frame parsing.
//!
//! The wire format is a sequence of frames separated by a blank line. Each
//! frame has at most one `event:` line and any number of `data:` lines:
//!
//! ```text
//! event: citations
//! data: [{"id":"1","title":"T","snippet":"S"}]
//!
//! data: partial answer text
//!
//! ```
//!
//! [`FrameParser`] keeps the residual state (unterminated text, the pending
//! event label and data lines) between chunks, so chunk boundaries may fall
//! anywhere: inside a prefix, inside a label, between `\r` and `\n`, or in
//! the middle of a multi-byte character.

use tracing::trace;

use crate::error::{StreamError, StreamResult};

/// Label given to frames that carry no `event:` line.
pub const DEFAULT_EVENT: &str = "message";

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Event label, [`DEFAULT_EVENT`] when the frame had none.
    pub event: String,
    /// Data lines joined with `\n`.
    pub data: String,
}

impl Frame {
    /// Create a frame with an explicit label.
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// Create an unlabeled frame.
    pub fn message(data: impl Into<String>) -> Self {
        Self::new(DEFAULT_EVENT, data)
    }

    /// Whether the frame carried no explicit label.
    #[must_use]
    pub fn is_default_event(&self) -> bool {
        self.event == DEFAULT_EVENT
    }
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum residual size in bytes: the unterminated line plus the data
    /// lines of the frame still waiting for its blank line.
    pub max_buffer_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

impl ParserConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum buffer size.
    pub fn max_buffer_size(mut self, bytes: usize) -> Self {
        self.max_buffer_size = bytes;
        self
    }
}

/// Incremental parser for one answer stream.
///
/// Create one parser per stream, feed it every chunk in arrival order and
/// call [`flush`](Self::flush) once the transport reports end of stream.
#[derive(Debug, Default)]
pub struct FrameParser {
    config: ParserConfig,
    buffer: String,
    current_event: Option<String>,
    data_lines: Vec<String>,
    data_bytes: usize,
    // Tail of the last byte chunk that ends inside a UTF-8 sequence.
    pending_bytes: Vec<u8>,
}

impl FrameParser {
    /// Create a new parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with the given config.
    #[must_use]
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Feed raw bytes into the parser.
    ///
    /// A multi-byte character split across chunks is reassembled; invalid
    /// sequences become U+FFFD.
    ///
    /// On overflow the frames completed by this chunk are lost; use
    /// [`feed_into`](Self::feed_into) to keep them.
    pub fn feed(&mut self, bytes: &[u8]) -> StreamResult<Vec<Frame>> {
        let mut frames = Vec::new();
        self.feed_into(bytes, &mut frames)?;
        Ok(frames)
    }

    /// Feed text into the parser, returning every frame it completes.
    pub fn feed_str(&mut self, chunk: &str) -> StreamResult<Vec<Frame>> {
        let mut frames = Vec::new();
        self.feed_str_into(chunk, &mut frames)?;
        Ok(frames)
    }

    /// Feed raw bytes, appending completed frames to `frames`.
    ///
    /// Frames completed before the residual limit was hit are appended even
    /// when [`StreamError::BufferOverflow`] is returned.
    pub fn feed_into(&mut self, bytes: &[u8], frames: &mut Vec<Frame>) -> StreamResult<()> {
        let chunk = self.decode(bytes);
        self.feed_str_into(&chunk, frames)
    }

    /// Feed text, appending completed frames to `frames`.
    ///
    /// See [`feed_into`](Self::feed_into).
    pub fn feed_str_into(&mut self, chunk: &str, frames: &mut Vec<Frame>) -> StreamResult<()> {
        self.buffer.push_str(chunk);
        self.drain_lines(frames);

        if self.residual_len() > self.config.max_buffer_size {
            return Err(StreamError::BufferOverflow {
                limit: self.config.max_buffer_size,
            });
        }

        Ok(())
    }

    /// Bytes held between chunks: the unterminated line and pending data lines.
    #[must_use]
    pub fn residual_len(&self) -> usize {
        self.buffer.len() + self.data_bytes
    }

    /// Call when the stream ends to recover a trailing frame that never got
    /// its terminating blank line.
    ///
    /// Any unterminated text is treated as a final line first. The parser is
    /// empty afterwards.
    pub fn flush(&mut self) -> Option<Frame> {
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }

        let rest = std::mem::take(&mut self.buffer);
        let line = rest.strip_suffix('\r').unwrap_or(&rest);
        if !line.is_empty() {
            self.apply_field(line);
        }

        let frame = self.take_frame();
        if frame.is_some() {
            trace!("Recovered unterminated trailing frame");
        }
        self.clear();
        frame
    }

    /// Whether the parser holds no residual state.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
            && self.current_event.is_none()
            && self.data_lines.is_empty()
            && self.pending_bytes.is_empty()
    }

    /// Reset the parser state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.current_event = None;
        self.data_lines.clear();
        self.data_bytes = 0;
        self.pending_bytes.clear();
    }

    fn drain_lines(&mut self, frames: &mut Vec<Frame>) {
        let mut buffer = std::mem::take(&mut self.buffer);
        let mut consumed = 0;

        while let Some(offset) = buffer[consumed..].find('\n') {
            let end = consumed + offset;
            let raw = &buffer[consumed..end];
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
            consumed = end + 1;
        }

        buffer.drain(..consumed);
        self.buffer = buffer;
    }

    fn process_line(&mut self, line: &str) -> Option<Frame> {
        if line.is_empty() {
            return self.take_frame();
        }
        self.apply_field(line);
        None
    }

    // A non-empty line only updates the pending frame.
    fn apply_field(&mut self, line: &str) {
        if let Some(label) = line.strip_prefix(EVENT_PREFIX) {
            let label = label.trim();
            self.current_event = (!label.is_empty()).then(|| label.to_string());
        } else if let Some(value) = line.strip_prefix(DATA_PREFIX) {
            // Only the single space separating field and value is dropped.
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data_bytes += value.len();
            self.data_lines.push(value.to_string());
        } else {
            trace!(line_len = line.len(), "Ignoring non-frame line");
        }
    }

    fn take_frame(&mut self) -> Option<Frame> {
        let event = self.current_event.take();
        if self.data_lines.is_empty() {
            return None;
        }

        self.data_bytes = 0;
        let data = std::mem::take(&mut self.data_lines).join("\n");
        Some(Frame {
            event: event.unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
        })
    }

    fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending_bytes);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut start = 0;
        loop {
            match std::str::from_utf8(&input[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = input.len();
                    break;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&input[start..valid_end]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending_bytes = input[start..].to_vec();
        out
    }
}
