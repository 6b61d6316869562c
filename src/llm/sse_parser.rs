// ABOUTME: Line-buffering Server-Sent Events parser for streaming model responses
// ABOUTME: Reassembles data lines split across network chunks and bounds idle time between chunks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # SSE Stream Parser
//!
//! Network chunk boundaries do not line up with SSE event boundaries: one chunk
//! may carry several `data:` lines, and a JSON payload may be split across two
//! chunks. [`SseLineBuffer`] holds partial lines as raw bytes until their
//! newline arrives, so a multi-byte character split across chunks is decoded
//! only once it is whole.
//!
//! [`sse_events`] wraps a raw byte stream into a stream of [`SseEvent`]s and
//! fails with [`ModelError::Timeout`] when the endpoint goes silent for longer
//! than the configured idle deadline.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;
use std::time::Duration;

use adchat_core::errors::ModelError;
use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{Stream, StreamExt};
use tokio::time::timeout;

/// Terminal marker used by OpenAI-compatible endpoints
const DONE_MARKER: &str = "[DONE]";

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// The `[DONE]` termination signal
    Done,
}

/// Boxed stream of parsed SSE events
pub type SseEventStream = Pin<Box<dyn Stream<Item = Result<SseEvent, ModelError>> + Send>>;

/// Line buffer that emits complete SSE events only
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and return every event completed by it
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            events.extend(parse_line(&String::from_utf8_lossy(&line)));
        }
        events
    }

    /// Drain a trailing line that never received its newline
    pub fn flush(&mut self) -> Option<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&remaining))
    }
}

/// Parse one SSE line; blank lines, comments, and non-data fields yield nothing
fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }
    if data == DONE_MARKER {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(data.to_owned()))
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    parser: SseLineBuffer,
    pending: VecDeque<Result<SseEvent, ModelError>>,
    ended: bool,
}

/// Wrap a raw byte stream into parsed SSE events
///
/// `idle_timeout` bounds the wait for each network chunk, not the whole stream.
pub fn sse_events<S>(byte_stream: S, idle_timeout: Duration) -> SseEventStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(byte_stream),
        parser: SseLineBuffer::new(),
        pending: VecDeque::new(),
        ended: false,
    };

    let stream = unfold(state, move |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.ended {
                return None;
            }

            match timeout(idle_timeout, state.bytes.next()).await {
                Ok(Some(Ok(chunk))) => {
                    state
                        .pending
                        .extend(state.parser.feed(&chunk).into_iter().map(Ok));
                }
                Ok(Some(Err(e))) => {
                    state.ended = true;
                    let error = if e.is_timeout() {
                        ModelError::Timeout {
                            after_secs: idle_timeout.as_secs(),
                        }
                    } else {
                        ModelError::Transport(format!("stream read error: {e}"))
                    };
                    state.pending.push_back(Err(error));
                }
                Ok(None) => {
                    state.ended = true;
                    state.pending.extend(state.parser.flush().map(Ok));
                }
                Err(_) => {
                    state.ended = true;
                    state.pending.push_back(Err(ModelError::Timeout {
                        after_secs: idle_timeout.as_secs(),
                    }));
                }
            }
        }
    });

    Box::pin(stream)
}
