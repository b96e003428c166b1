//! Upstream event classification

use serde::Deserialize;
use serde_json::Value;

use super::FrameParseError;

/// Literal payload closing the upstream stream
pub const DONE_MARKER: &str = "[DONE]";

/// Classified form of one upstream frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    /// Full text block (`event: "message"`)
    Message { text: String },
    /// Incremental text (`event: "message_delta"`)
    MessageDelta { delta: String },
    /// End of the answer (`event: "message_end"`)
    MessageEnd,
    /// The `[DONE]` literal
    Done,
    /// JSON with an unrecognised event name
    Other { delta: Option<String>, raw: String },
    /// Payload that is not JSON at all
    Raw(String),
}

impl UpstreamEvent {
    /// Text this event contributes to the answer, if any.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            UpstreamEvent::Message { text } => Some(text),
            UpstreamEvent::MessageDelta { delta } => Some(delta),
            UpstreamEvent::Other { delta: Some(delta), .. } => Some(delta),
            UpstreamEvent::Other { delta: None, raw } => Some(raw),
            UpstreamEvent::Raw(text) => Some(text),
            UpstreamEvent::MessageEnd | UpstreamEvent::Done => None,
        }
    }

    /// Text this event adds to an aggregated (non-streamed) answer.
    ///
    /// Same as [`fragment`](Self::fragment) except that unrecognised events
    /// without a delta contribute nothing.
    pub fn answer_text(&self) -> Option<&str> {
        match self {
            UpstreamEvent::Other { delta: None, .. } => None,
            _ => self.fragment(),
        }
    }

    /// Whether this event ends the answer.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UpstreamEvent::MessageEnd | UpstreamEvent::Done)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl Envelope {
    fn data_str(&self, field: &str) -> Option<&str> {
        self.data.as_ref()?.get(field)?.as_str()
    }
}

/// Classify one extracted payload.
///
/// Payloads that are not JSON come back as a [`FrameParseError`] carrying the
/// original text.
pub fn classify(payload: &str) -> Result<UpstreamEvent, FrameParseError> {
    if payload == DONE_MARKER {
        return Ok(UpstreamEvent::Done);
    }

    let value: Value = serde_json::from_str(payload).map_err(|source| FrameParseError {
        payload: payload.to_string(),
        source,
    })?;
    // Valid JSON that is not an envelope (a bare number, a string) still counts
    // as an unrecognised event.
    let envelope = Envelope::deserialize(&value).unwrap_or_default();

    let event = match envelope.event.as_deref() {
        Some("message_delta") => UpstreamEvent::MessageDelta {
            delta: envelope.data_str("delta").unwrap_or_default().to_string(),
        },
        Some("message") => UpstreamEvent::Message {
            text: envelope.data_str("text").unwrap_or_default().to_string(),
        },
        Some("message_end") => UpstreamEvent::MessageEnd,
        _ => UpstreamEvent::Other {
            delta: envelope
                .data_str("delta")
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            raw: payload.to_string(),
        },
    };

    Ok(event)
}
