//! Per-request translation of the upstream byte stream into events
//!
//! [`Translator`] is a pure state object: bytes in, classified events out.
//! [`upstream_events`] drives it over an async byte stream with a bounded
//! wait on every read.

use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use super::event::{classify, UpstreamEvent};
use super::frame::{extract_payload, FrameBuffer};
use super::StreamError;

/// Translator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    /// No event produced yet
    Buffering,
    /// At least one event produced
    Emitting,
    /// Terminal event seen or input exhausted; further input is ignored
    Done,
}

/// Incremental upstream stream translator.
#[derive(Debug)]
pub struct Translator {
    frames: FrameBuffer,
    state: TranslatorState,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self {
            frames: FrameBuffer::new(),
            state: TranslatorState::Buffering,
        }
    }

    pub fn state(&self) -> TranslatorState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == TranslatorState::Done
    }

    /// Feed one received chunk and return the events it completes.
    ///
    /// Nothing after a terminal event is returned, even from the same chunk.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<UpstreamEvent> {
        if self.is_done() {
            return Vec::new();
        }
        let frames = self.frames.feed(bytes);
        self.process(frames)
    }

    /// Signal end of input. A trailing frame without delimiter is parsed too.
    pub fn finish(&mut self) -> Vec<UpstreamEvent> {
        if self.is_done() {
            return Vec::new();
        }
        if self.frames.has_incomplete() {
            debug!("Upstream ended mid-frame, parsing trailing bytes");
        }
        let rest = self.frames.take_remaining();
        let events = self.process(rest.into_iter().collect());
        self.state = TranslatorState::Done;
        events
    }

    fn process(&mut self, frames: Vec<String>) -> Vec<UpstreamEvent> {
        let mut events = Vec::new();

        for frame in frames {
            let Some(payload) = extract_payload(&frame) else {
                continue;
            };

            let event = classify(&payload).unwrap_or_else(|err| {
                debug!(error = %err, "Upstream frame is not JSON, forwarding as text");
                UpstreamEvent::Raw(err.payload)
            });

            self.state = TranslatorState::Emitting;
            let terminal = event.is_terminal();
            events.push(event);

            if terminal {
                self.state = TranslatorState::Done;
                break;
            }
        }

        events
    }
}

/// Lazily translate an upstream byte stream into events.
///
/// The sequence ends after a terminal event, at end of input, or after
/// yielding a single [`StreamError`] for a failed or stalled read. Dropping
/// it drops the underlying byte stream.
pub fn upstream_events<S, E>(
    mut bytes: S,
    read_timeout: Duration,
) -> impl Stream<Item = Result<UpstreamEvent, StreamError>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    async_stream::stream! {
        let mut translator = Translator::new();

        loop {
            let next = match tokio::time::timeout(read_timeout, bytes.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(timeout_secs = read_timeout.as_secs_f64(), "Upstream read timed out");
                    yield Err(StreamError::Timeout(read_timeout));
                    break;
                }
            };

            match next {
                Some(Ok(chunk)) => {
                    for event in translator.feed(&chunk) {
                        yield Ok(event);
                    }
                    if translator.is_done() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Upstream stream failed");
                    yield Err(StreamError::Read(e.to_string()));
                    break;
                }
                None => {
                    for event in translator.finish() {
                        yield Ok(event);
                    }
                    break;
                }
            }
        }
    }
}

/// Concatenate the answer text until a terminal event or end of input.
///
/// Unrecognised events without a delta are skipped.
pub async fn collect_text<S>(events: S) -> Result<String, StreamError>
where
    S: Stream<Item = Result<UpstreamEvent, StreamError>>,
{
    let mut events = std::pin::pin!(events);
    let mut text = String::new();

    while let Some(event) = events.next().await {
        let event = event?;
        if let Some(fragment) = event.answer_text() {
            text.push_str(fragment);
        }
        if event.is_terminal() {
            break;
        }
    }

    Ok(text)
}

/// Answer text of a JSON (non-SSE) upstream body.
///
/// Prefers `text`, then an OpenAI-style `choices[0].message.content`, and
/// falls back to the serialized body.
pub fn text_from_json_body(body: &Value) -> String {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_empty(body.get("text"))
        .or_else(|| non_empty(body.pointer("/choices/0/message/content")))
        .unwrap_or_else(|| body.to_string())
}
