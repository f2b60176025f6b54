use super::logging::emit_undecoded_line;
use serde_json::Value;

/// Framing of an agent response body, taken from its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    EventStream,
    JsonDocument,
    Opaque,
}

impl ContentType {
    pub fn from_header(content_type: &str) -> Self {
        let normalized = content_type.trim().to_ascii_lowercase();
        if normalized.contains("text/event-stream") {
            ContentType::EventStream
        } else if normalized.starts_with("application/json") {
            ContentType::JsonDocument
        } else {
            ContentType::Opaque
        }
    }
}

/// One item pulled out of the transport stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedUnit {
    /// An event-stream line that decoded as JSON.
    Json { line: String, value: Value },
    /// An event-stream line (or document) that failed JSON decoding.
    Undecoded(String),
    /// Final text from a JSON document or an opaque body.
    Text(String),
}

#[derive(Debug)]
pub struct StreamDecoder {
    content_type: ContentType,
    buffer: Vec<u8>,
}

impl StreamDecoder {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            buffer: Vec::new(),
        }
    }

    /// Feeds one transport chunk. Only event streams yield units before
    /// [`StreamDecoder::finish`]; the other framings need the whole body.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<DecodedUnit> {
        self.buffer.extend_from_slice(chunk);
        if self.content_type != ContentType::EventStream {
            return Vec::new();
        }

        let mut units = Vec::new();
        let mut start = 0;
        while let Some(end) = self.buffer[start..].iter().position(|byte| *byte == b'\n') {
            let line_end = start + end;
            let line = String::from_utf8_lossy(&self.buffer[start..line_end]).into_owned();
            if let Some(unit) = decode_event_stream_line(&line) {
                units.push(unit);
            }
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        units
    }

    /// Flushes whatever is left once the transport is exhausted.
    pub fn finish(&mut self) -> Vec<DecodedUnit> {
        let rest = std::mem::take(&mut self.buffer);
        let body = String::from_utf8_lossy(&rest).into_owned();

        match self.content_type {
            ContentType::EventStream => decode_event_stream_line(&body).into_iter().collect(),
            ContentType::JsonDocument => vec![decode_json_document(&body)],
            ContentType::Opaque => {
                if body.is_empty() {
                    Vec::new()
                } else {
                    vec![DecodedUnit::Text(body)]
                }
            }
        }
    }
}

fn decode_event_stream_line(line: &str) -> Option<DecodedUnit> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return None;
    }
    if is_framing_field(line) {
        tracing::trace!(line = %line, "Skipping event-stream framing field");
        return None;
    }

    let payload = line
        .strip_prefix("data: ")
        .or_else(|| line.strip_prefix("data:"))
        .unwrap_or(line);
    if payload.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(DecodedUnit::Json {
            line: payload.to_string(),
            value,
        }),
        Err(error) => {
            emit_undecoded_line(payload, &error);
            Some(DecodedUnit::Undecoded(payload.to_string()))
        }
    }
}

fn is_framing_field(line: &str) -> bool {
    line.starts_with(':')
        || line.starts_with("event:")
        || line.starts_with("id:")
        || line.starts_with("retry:")
}

fn decode_json_document(body: &str) -> DecodedUnit {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if map.contains_key("message") => match &map["message"] {
            Value::String(text) => DecodedUnit::Text(text.clone()),
            other => DecodedUnit::Text(other.to_string()),
        },
        Ok(other) => DecodedUnit::Text(other.to_string()),
        Err(error) => {
            emit_undecoded_line(body, &error);
            DecodedUnit::Undecoded(body.to_string())
        }
    }
}
