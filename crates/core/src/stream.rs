//! Decoding of the agent runtime's server-sent-event stream.
//!
//! The runtime does not promise a stable event encoding, so [`StreamDecoder`]
//! recognizes every shape seen so far and silently drops the rest. Lines that
//! are not JSON at all are surfaced verbatim as [`StreamOutput::Passthrough`]
//! so plain-text diagnostics from the service still reach the user.

use serde_json::Value;
use tracing::trace;

use crate::extract::{extract_text, joined_text_blocks};

/// What one stream line contributed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamOutput {
    /// An assistant text increment; also appended to the accumulated response.
    Text(String),
    /// A non-JSON line, shown as-is on its own line and not accumulated.
    Passthrough(String),
}

/// One attempt at pulling a text increment out of a parsed event.
type EventAttempt = fn(&Value) -> Option<String>;

const EVENT_ATTEMPTS: [EventAttempt; 4] =
    [direct_delta, content_block_delta, message_content, result_fallback];

#[derive(Debug, Default)]
pub struct StreamDecoder {
    accumulated: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode_line(&mut self, line: &str) -> Option<StreamOutput> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            return None;
        }

        let payload = strip_data_prefix(line);
        if is_control_line(payload) {
            return None;
        }

        let event = match serde_json::from_str::<Value>(payload) {
            Ok(event) => event,
            Err(_) => return Some(StreamOutput::Passthrough(payload.to_string())),
        };

        match decode_event(&event) {
            Some(text) => {
                self.accumulated.push_str(&text);
                Some(StreamOutput::Text(text))
            }
            None => {
                trace!(event_name = "stream.event.dropped", %event, "unrecognized stream event");
                None
            }
        }
    }

    /// Ends the stream, returning the full response text.
    pub fn finish(self) -> String {
        self.accumulated
    }
}

/// Text increment carried by one parsed event, if any.
pub fn decode_event(event: &Value) -> Option<String> {
    if let Some(text) = event.as_str() {
        return (!text.is_empty()).then(|| text.to_string());
    }
    if !event.is_object() {
        return None;
    }

    EVENT_ATTEMPTS.iter().find_map(|attempt| attempt(event))
}

fn strip_data_prefix(line: &str) -> &str {
    match line.strip_prefix("data:") {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    }
}

fn is_control_line(payload: &str) -> bool {
    payload.is_empty()
        || payload.starts_with(':')
        || payload.starts_with("event:")
        || payload.trim() == "[DONE]"
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).filter(|text| !text.is_empty()).map(str::to_string)
}

fn direct_delta(event: &Value) -> Option<String> {
    non_empty_str(event.get("text")).or_else(|| non_empty_str(event.get("delta")))
}

fn content_block_delta(event: &Value) -> Option<String> {
    let delta = event.get("contentBlockDelta")?.get("delta")?;
    match delta {
        Value::String(text) => (!text.is_empty()).then(|| text.clone()),
        Value::Object(_) => non_empty_str(delta.get("text")),
        _ => None,
    }
}

/// Stream deltas are fragments of one paragraph, so no separator.
fn message_content(event: &Value) -> Option<String> {
    joined_text_blocks(event.get("message")?.get("content")?, "")
}

fn result_fallback(event: &Value) -> Option<String> {
    event.get("result")?;
    extract_text(event).filter(|text| !text.is_empty())
}

/// Splits a chunked byte stream into lines.
///
/// Chunks may end mid-line; the remainder is carried into the next
/// [`LineBuffer::push`]. Bytes are decoded as lossy UTF-8 once a line is
/// complete, so multi-byte characters split across chunks survive.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed, without the
    /// trailing `\n` / `\r\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(position) = self.pending.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=position).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Flushes an unterminated final line.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let mut pending = self.pending;
        if pending.last() == Some(&b'\r') {
            pending.pop();
        }
        Some(String::from_utf8_lossy(&pending).into_owned())
    }
}
