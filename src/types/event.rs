use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Where a tool invocation was reported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    /// Native agent engine blocks (`contentBlockStart`, completed messages).
    Engine,
    /// Tool events classified by the entrypoint before they reach the stream.
    Discovered,
}

impl ToolSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolSource::Engine => "engine",
            ToolSource::Discovered => "discovered",
        }
    }
}

/// Identity of one tool invocation within a turn.
///
/// The explicit invocation id wins when the transport carries one. Otherwise
/// the key is derived from source and name so that an engine tool and a
/// discovered tool that happen to share a name stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolKey(String);

impl ToolKey {
    pub fn derive(id: &str, source: ToolSource, name: &str) -> Self {
        if id.is_empty() {
            Self(format!("{}:{name}", source.as_str()))
        } else {
            Self(id.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub key: ToolKey,
    pub source: ToolSource,
    pub id: String,
    pub name: String,
    pub input: Map<String, Value>,
}

impl ToolUse {
    pub fn new(source: ToolSource, id: String, name: String, input: Map<String, Value>) -> Self {
        Self {
            key: ToolKey::derive(&id, source, &name),
            source,
            id,
            name,
            input,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub latency_ms: u64,
}

/// Usage and latency reported once per agent response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub usage: Usage,
    pub metrics: Metrics,
}

impl Metadata {
    /// Lenient conversion, field by field. A missing or mistyped field reads
    /// as zero without affecting its siblings; floats are truncated.
    pub fn from_value(value: &Value) -> Self {
        let usage = value.get("usage");
        let metrics = value.get("metrics");
        Self {
            usage: Usage {
                input_tokens: counter(usage, "inputTokens"),
                output_tokens: counter(usage, "outputTokens"),
                total_tokens: counter(usage, "totalTokens"),
            },
            metrics: Metrics {
                latency_ms: counter(metrics, "latencyMs"),
            },
        }
    }
}

fn counter(section: Option<&Value>, field: &str) -> u64 {
    let Some(value) = section.and_then(|section| section.get(field)) else {
        return 0;
    };
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|number| number.is_finite() && *number >= 0.0)
                .map(|number| number as u64)
        })
        .unwrap_or(0)
}

/// Semantic events extracted from the agent stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifiedEvent {
    /// Agent event loop is starting. The payload is kept for debug display.
    Init { payload: Value },
    MessageStart { payload: Value },
    TextDelta { text: String },
    ToolUse(ToolUse),
    /// Best-effort completion marker; `key` is `None` when nothing was open.
    ToolComplete { key: Option<ToolKey> },
    MessageStop { stop_reason: String },
    Metadata(Metadata),
    /// Engine-internal event loop cycle chatter.
    Internal { payload: Value },
    Raw { line: String },
    Error { message: String },
}

impl ClassifiedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedEvent::Init { .. } => "init",
            ClassifiedEvent::MessageStart { .. } => "message_start",
            ClassifiedEvent::TextDelta { .. } => "text_delta",
            ClassifiedEvent::ToolUse(_) => "tool_use",
            ClassifiedEvent::ToolComplete { .. } => "tool_complete",
            ClassifiedEvent::MessageStop { .. } => "message_stop",
            ClassifiedEvent::Metadata(_) => "metadata",
            ClassifiedEvent::Internal { .. } => "internal",
            ClassifiedEvent::Raw { .. } => "raw",
            ClassifiedEvent::Error { .. } => "error",
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ClassifiedEvent::TextDelta { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ClassifiedEvent::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_key_prefers_explicit_id() {
        let key = ToolKey::derive("toolu_1", ToolSource::Engine, "search");
        assert_eq!(key.as_str(), "toolu_1");
    }

    #[test]
    fn test_tool_key_derived_keys_keep_sources_apart() {
        let engine = ToolKey::derive("", ToolSource::Engine, "search");
        let discovered = ToolKey::derive("", ToolSource::Discovered, "search");
        assert_eq!(engine.as_str(), "engine:search");
        assert_eq!(discovered.as_str(), "discovered:search");
        assert_ne!(engine, discovered);
    }

    #[test]
    fn test_metadata_from_value_defaults_missing_fields() {
        let metadata = Metadata::from_value(&json!({"usage": {"inputTokens": 7}}));
        assert_eq!(metadata.usage.input_tokens, 7);
        assert_eq!(metadata.usage.output_tokens, 0);
        assert_eq!(metadata.metrics.latency_ms, 0);

        let metadata = Metadata::from_value(&json!({"usage": "garbage", "metrics": {"latencyMs": 12}}));
        assert_eq!(metadata.usage, Usage::default());
        assert_eq!(metadata.metrics.latency_ms, 12);
    }

    #[test]
    fn test_metadata_mistyped_field_keeps_its_siblings() {
        let metadata = Metadata::from_value(&json!({
            "usage": {"inputTokens": 10, "outputTokens": 4.0, "totalTokens": "14"},
            "metrics": {"latencyMs": 200.7}
        }));
        assert_eq!(metadata.usage.input_tokens, 10);
        assert_eq!(metadata.usage.output_tokens, 4);
        assert_eq!(metadata.usage.total_tokens, 0);
        assert_eq!(metadata.metrics.latency_ms, 200);

        let metadata = Metadata::from_value(&json!({"usage": {"inputTokens": -3, "outputTokens": 2}}));
        assert_eq!(metadata.usage.input_tokens, 0);
        assert_eq!(metadata.usage.output_tokens, 2);
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let value = serde_json::to_value(ClassifiedEvent::text("hi")).unwrap();
        assert_eq!(value, json!({"kind": "text_delta", "text": "hi"}));
    }
}
