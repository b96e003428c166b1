//! Frame buffering and payload extraction
//!
//! Upstream frames are blocks of text separated by a blank line. The bytes
//! arrive in chunks that may split a frame, or a UTF-8 character, anywhere.

use bytes::{Buf, BytesMut};
use once_cell::sync::Lazy;
use regex::Regex;

const FRAME_DELIMITER: &[u8] = b"\n\n";

/// Lines made only of hex digits are chunked-transfer size markers leaking
/// through the upstream proxy.
static HEX_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]+$").expect("hex line pattern is valid"));

/// Buffer for accumulating incomplete frames across chunk boundaries.
///
/// Bytes are kept undecoded until a whole frame is available, so a multi-byte
/// character split across two chunks decodes correctly.
///
/// # Example
/// ```
/// use chat_bridge::streaming::FrameBuffer;
///
/// let mut buffer = FrameBuffer::new();
///
/// let frames = buffer.feed(b"data: {\"event\":\"message_delta\",");
/// assert!(frames.is_empty());
///
/// let frames = buffer.feed(b"\"data\":{\"delta\":\"A\"}}\n\n");
/// assert_eq!(
///     frames,
///     vec!["data: {\"event\":\"message_delta\",\"data\":{\"delta\":\"A\"}}"]
/// );
/// ```
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::new(),
        }
    }

    /// Feed bytes into the buffer and return every complete frame.
    ///
    /// The delimiter is stripped from returned frames. Trailing data without
    /// a delimiter stays buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = find_delimiter(&self.pending) {
            let frame = self.pending.split_to(pos);
            self.pending.advance(FRAME_DELIMITER.len());
            frames.push(String::from_utf8_lossy(&frame).into_owned());
        }

        frames
    }

    pub fn has_incomplete(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain whatever is left once the byte stream has ended.
    pub fn take_remaining(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}

/// Extract the payload text of one frame.
///
/// Blank and hex-only lines are dropped; a leading `data:` marker is stripped
/// and the rest trimmed, other lines are kept verbatim. The candidates are
/// joined with newlines. Returns `None` when nothing remains.
pub fn extract_payload(frame: &str) -> Option<String> {
    let block = frame.trim();
    if block.is_empty() {
        return None;
    }

    let parts: Vec<&str> = block
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !HEX_LINE.is_match(line))
        .map(|line| match line.strip_prefix("data:") {
            Some(rest) => rest.trim(),
            None => line,
        })
        .collect();

    let payload = parts.join("\n");
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}
