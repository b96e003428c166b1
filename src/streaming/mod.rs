//! Upstream stream translation
//!
//! Reassembles blank-line-delimited frames from the upstream byte stream,
//! classifies each payload and hands back normalized events. Nothing in here
//! performs I/O except [`upstream_events`], which only pulls from the stream
//! it is given.

pub mod event;
pub mod frame;
pub mod translator;

use std::time::Duration;

use thiserror::Error;

pub use event::{classify, UpstreamEvent};
pub use frame::{extract_payload, FrameBuffer};
pub use translator::{
    collect_text, text_from_json_body, upstream_events, Translator, TranslatorState,
};

/// A frame payload that is not JSON.
///
/// Never surfaced to callers: the translator forwards `payload` as plain text.
#[derive(Debug, Error)]
#[error("Frame payload is not JSON: {source}")]
pub struct FrameParseError {
    pub payload: String,
    #[source]
    pub source: serde_json::Error,
}

/// Errors that end an upstream stream early.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Upstream read timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream stream failed: {0}")]
    Read(String),
}

impl StreamError {
    /// Short machine-readable code for SSE error events
    pub fn code(&self) -> &'static str {
        match self {
            StreamError::Timeout(_) => "upstream_timeout",
            StreamError::Read(_) => "upstream_read_error",
        }
    }
}
