use serde_json::Value;

use crate::delta::classify;
use crate::errors::DecodeError;
use crate::events::{StreamEvent, StreamMetadata};
use crate::summary::StructuredSummary;

/// Prefix marking a line that carries an event payload.
const EVENT_PREFIX: &str = "data:";

/// Incremental splitter turning response-body chunks into complete lines.
///
/// Chunk boundaries do not align with line boundaries, so partial lines are
/// buffered until their terminator arrives.
#[derive(Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(idx) = self.buf.iter().position(|&b| b == b'\n') {
            let line_bytes = self.buf[..idx].to_vec();
            self.buf.drain(..=idx);
            lines.push(to_line(&line_bytes));
        }
        lines
    }

    /// Drains a trailing unterminated line once the body is exhausted.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = to_line(&self.buf);
        self.buf.clear();
        Some(line)
    }
}

fn to_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

/// Decodes one line of the response body into an event.
///
/// Lines without the event prefix (blank keep-alives, comments) are ignored.
/// A prefixed line whose payload does not parse is a recoverable
/// `DecodeError::Malformed`: the session skips it and keeps reading.
pub fn decode_line(line: &str) -> Result<Option<StreamEvent>, DecodeError> {
    let Some(rest) = line.strip_prefix(EVENT_PREFIX) else {
        return Ok(None);
    };
    let payload = rest.trim();
    if payload.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| DecodeError::malformed(payload, e.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(DecodeError::malformed(payload, "payload is not an object"));
    };

    if object.get("type").and_then(Value::as_str) == Some("metadata") {
        let data = object.get("data").cloned().unwrap_or(Value::Null);
        let metadata: StreamMetadata = serde_json::from_value(data)
            .map_err(|e| DecodeError::malformed(payload, format!("invalid metadata: {e}")))?;
        return Ok(Some(StreamEvent::Metadata(metadata)));
    }

    let tokens_used = object
        .get("tokens_used")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    if let Some(state_value) = object.get("state") {
        // A patch frame that also carries a non-null error is terminal.
        if let Some(error) = object.get("error").filter(|v| !v.is_null()) {
            return Ok(Some(StreamEvent::Error {
                message: error_message(error),
                tokens_used,
            }));
        }
        let state: StructuredSummary = serde_json::from_value(state_value.clone())
            .map_err(|e| DecodeError::malformed(payload, format!("invalid state: {e}")))?;
        let delta = object
            .get("delta")
            .filter(|v| !v.is_null())
            .and_then(classify);
        let done = object.get("done").and_then(Value::as_bool).unwrap_or(false);
        let latency_ms = object.get("latency_ms").and_then(Value::as_f64);
        return Ok(Some(StreamEvent::Patch {
            delta,
            state,
            done,
            tokens_used,
            latency_ms,
        }));
    }

    if let Some(error) = object.get("error").filter(|v| !v.is_null()) {
        return Ok(Some(StreamEvent::Error {
            message: error_message(error),
            tokens_used,
        }));
    }

    // Valid JSON of an unknown shape; tolerated and skipped.
    Ok(None)
}

fn error_message(error: &Value) -> String {
    match error.as_str() {
        Some(message) => message.to_string(),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::PatchOperation;

    #[test]
    fn line_buffer_handles_partial_chunk_boundaries() {
        let mut buffer = LineBuffer::default();
        let first = buffer.push_chunk(b"data: {\"state\":{\"title\":\"he");
        assert!(first.is_empty());
        let second = buffer.push_chunk(b"llo\"},\"done\":false}\n\ndata:");
        assert_eq!(second.len(), 2);
        assert!(second[0].contains("hello"));
        assert_eq!(second[1], "");
        assert_eq!(buffer.finish().as_deref(), Some("data:"));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn line_buffer_strips_carriage_returns() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push_chunk(b"data: {}\r\n");
        assert_eq!(lines, vec!["data: {}".to_string()]);
    }

    #[test]
    fn non_prefixed_lines_are_ignored() {
        assert_eq!(decode_line("").expect("blank"), None);
        assert_eq!(decode_line(": keep-alive").expect("comment"), None);
        assert_eq!(decode_line("event: patch").expect("other field"), None);
    }

    #[test]
    fn empty_payload_after_prefix_is_ignored() {
        assert_eq!(decode_line("data:").expect("empty"), None);
        assert_eq!(decode_line("data:   ").expect("spaces"), None);
    }

    #[test]
    fn garbled_payload_is_a_recoverable_decode_error() {
        let err = decode_line("data: {not json").expect_err("should fail");
        assert!(matches!(err, DecodeError::Malformed { .. }));
        let err = decode_line("data: 42").expect_err("non-object");
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn metadata_type_takes_precedence() {
        let event = decode_line(
            r#"data: {"type":"metadata","data":{"input_type":"url","url":"https://example.com/a","style":"executive"}}"#,
        )
        .expect("decode")
        .expect("event");
        let StreamEvent::Metadata(metadata) = event else {
            panic!("expected metadata, got {event:?}");
        };
        assert_eq!(metadata.input_type, "url");
        assert_eq!(metadata.style, "executive");
    }

    #[test]
    fn state_key_decodes_as_patch_with_advisory_delta() {
        let event = decode_line(
            r#"data: {"delta":{"op":"set","field":"title","value":"X"},"state":{"title":"X"},"done":false,"tokens_used":10}"#,
        )
        .expect("decode")
        .expect("event");
        let StreamEvent::Patch {
            delta,
            state,
            done,
            tokens_used,
            latency_ms,
        } = event
        else {
            panic!("expected patch");
        };
        assert!(matches!(delta, Some(PatchOperation::Set { .. })));
        assert_eq!(state.title.as_deref(), Some("X"));
        assert!(!done);
        assert_eq!(tokens_used, 10);
        assert_eq!(latency_ms, None);
    }

    #[test]
    fn null_and_unknown_deltas_do_not_block_the_patch() {
        for line in [
            r#"data: {"delta":null,"state":{},"done":true,"tokens_used":5,"latency_ms":9.5}"#,
            r#"data: {"delta":{"op":"merge"},"state":{},"done":true,"tokens_used":5,"latency_ms":9.5}"#,
        ] {
            let event = decode_line(line).expect("decode").expect("event");
            let StreamEvent::Patch {
                delta,
                done,
                latency_ms,
                ..
            } = event
            else {
                panic!("expected patch");
            };
            assert_eq!(delta, None);
            assert!(done);
            assert_eq!(latency_ms, Some(9.5));
        }
    }

    #[test]
    fn state_with_non_null_error_is_terminal_error() {
        let event = decode_line(
            r#"data: {"state":{"title":"X"},"error":"model overloaded","done":true,"tokens_used":30}"#,
        )
        .expect("decode")
        .expect("event");
        assert_eq!(
            event,
            StreamEvent::Error {
                message: "model overloaded".into(),
                tokens_used: 30,
            }
        );
    }

    #[test]
    fn state_with_explicit_null_error_is_still_a_patch() {
        let event = decode_line(r#"data: {"state":{},"error":null,"done":false,"tokens_used":1}"#)
            .expect("decode")
            .expect("event");
        assert!(matches!(event, StreamEvent::Patch { .. }));
    }

    #[test]
    fn bare_error_object_is_terminal_error() {
        let event = decode_line(r#"data: {"error":"quota exceeded","done":true,"tokens_used":0}"#)
            .expect("decode")
            .expect("event");
        assert_eq!(
            event,
            StreamEvent::Error {
                message: "quota exceeded".into(),
                tokens_used: 0,
            }
        );
    }

    #[test]
    fn unknown_object_shapes_are_skipped() {
        assert_eq!(
            decode_line(r#"data: {"type":"heartbeat","ts":1}"#).expect("decode"),
            None
        );
    }
}
