use super::stream::DecodedUnit;
use crate::state::ToolLedger;
use crate::tool_hint::{infer_tool_label_for_value, is_placeholder_name, UNKNOWN_TOOL};
use crate::types::{ClassifiedEvent, Metadata, ToolSource, ToolUse};
use serde_json::{Map, Value};

/// Substring that marks the agent engine's internal event loop chatter.
pub const INTERNAL_CYCLE_MARKER: &str = "event_loop_cycle_id";

const INIT_FLAGS: [&str; 3] = ["init_event_loop", "start", "start_event_loop"];

/// Turns decoded units into semantic events.
///
/// The only state carried between units is the tool ledger, so a fresh
/// classifier must be used for every turn.
#[derive(Debug, Default)]
pub struct EventClassifier {
    ledger: ToolLedger,
    raw_mode: bool,
}

impl EventClassifier {
    pub fn new(raw_mode: bool) -> Self {
        Self {
            ledger: ToolLedger::new(),
            raw_mode,
        }
    }

    pub fn ledger(&self) -> &ToolLedger {
        &self.ledger
    }

    pub fn classify(&mut self, unit: &DecodedUnit) -> Vec<ClassifiedEvent> {
        let mut events = Vec::new();
        if self.raw_mode {
            push_raw_views(unit, &mut events);
        }

        match unit {
            DecodedUnit::Json { value, .. } => self.classify_value(value, &mut events),
            DecodedUnit::Undecoded(line) => classify_undecoded(line, &mut events),
            DecodedUnit::Text(text) => push_text(text, &mut events),
        }
        events
    }

    fn classify_value(&mut self, value: &Value, events: &mut Vec<ClassifiedEvent>) {
        let Some(map) = value.as_object() else {
            match value.as_str() {
                Some(text) => push_text(text, events),
                None => tracing::trace!(unit = %value, "Dropping non-object stream unit"),
            }
            return;
        };

        if INIT_FLAGS
            .iter()
            .any(|flag| map.get(*flag).is_some_and(is_truthy))
        {
            events.push(ClassifiedEvent::Init {
                payload: value.clone(),
            });
        } else if let Some(event) = map.get("event") {
            self.classify_engine_event(event, events);
        } else if map.contains_key("tool_name")
            && map.get("type").and_then(Value::as_str) == Some("tool_use")
        {
            let tool = discovered_tool_use(map);
            self.push_tool_use(tool, events);
        } else if value.to_string().contains(INTERNAL_CYCLE_MARKER) {
            events.push(ClassifiedEvent::Internal {
                payload: value.clone(),
            });
        } else if let Some(content) = map.get("message").and_then(|message| message.get("content")) {
            // Completed messages repeat text that already streamed as deltas,
            // so only their tool blocks are of interest.
            for entry in content.as_array().into_iter().flatten() {
                if let Some(tool) = entry.get("toolUse") {
                    self.push_tool_use(engine_tool_use(tool), events);
                }
            }
        } else if let Some(Value::String(data)) = map.get("data") {
            push_text(data, events);
        } else {
            tracing::trace!(unit = %value, "Dropping stream unit with unrecognized shape");
        }
    }

    fn classify_engine_event(&mut self, event: &Value, events: &mut Vec<ClassifiedEvent>) {
        if let Some(start) = event.get("messageStart") {
            events.push(ClassifiedEvent::MessageStart {
                payload: start.clone(),
            });
        } else if let Some(delta) = event.get("contentBlockDelta") {
            match delta.pointer("/delta/text").and_then(Value::as_str) {
                Some(text) => push_text(text, events),
                None => tracing::trace!("Suppressing partial content block delta"),
            }
        } else if let Some(start) = event.get("contentBlockStart") {
            if let Some(tool) = start.pointer("/start/toolUse") {
                self.push_tool_use(engine_tool_use(tool), events);
            }
        } else if let Some(stop) = event.get("contentBlockStop") {
            let id = stop.get("toolUseId").and_then(Value::as_str);
            events.push(ClassifiedEvent::ToolComplete {
                key: self.ledger.settle(id),
            });
        } else if let Some(stop) = event.get("messageStop") {
            let stop_reason = stop
                .get("stopReason")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            events.push(ClassifiedEvent::MessageStop { stop_reason });
        } else if let Some(metadata) = event.get("metadata") {
            events.push(ClassifiedEvent::Metadata(Metadata::from_value(metadata)));
        } else {
            tracing::trace!(event = %event, "Dropping engine event with unrecognized shape");
        }
    }

    fn push_tool_use(&mut self, tool: ToolUse, events: &mut Vec<ClassifiedEvent>) {
        // Annotations from the entrypoint precede the engine event they label,
        // so they must not absorb the engine's completion.
        let admitted = match tool.source {
            ToolSource::Engine => self.ledger.admit(&tool.key),
            ToolSource::Discovered => self.ledger.admit_settled(&tool.key),
        };
        if admitted {
            tracing::debug!(key = %tool.key, name = %tool.name, "Tool invocation admitted");
            events.push(ClassifiedEvent::ToolUse(tool));
        } else {
            tracing::trace!(key = %tool.key, "Duplicate tool invocation suppressed");
        }
    }
}

fn classify_undecoded(line: &str, events: &mut Vec<ClassifiedEvent>) {
    if line.contains(INTERNAL_CYCLE_MARKER) {
        events.push(ClassifiedEvent::Internal {
            payload: Value::String(line.to_string()),
        });
    } else if line.starts_with("{'") || line.starts_with("{\"") {
        tracing::trace!(line = %line, "Dropping brace-prefixed raw line");
    } else {
        push_text(line, events);
    }
}

fn push_text(text: &str, events: &mut Vec<ClassifiedEvent>) {
    if !text.is_empty() {
        events.push(ClassifiedEvent::text(text));
    }
}

fn push_raw_views(unit: &DecodedUnit, events: &mut Vec<ClassifiedEvent>) {
    let views = match unit {
        DecodedUnit::Json { line, value } => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            vec![
                format!("RAW LINE: {line}"),
                format!("PARSED DATA: {pretty}"),
            ]
        }
        DecodedUnit::Undecoded(line) => vec![
            format!("RAW LINE: {line}"),
            format!("NON-JSON LINE: {line}"),
        ],
        DecodedUnit::Text(text) => vec![format!("RAW TEXT: {text}")],
    };
    events.extend(views.into_iter().map(|line| ClassifiedEvent::Raw { line }));
}

fn engine_tool_use(tool: &Value) -> ToolUse {
    let name = tool
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_TOOL)
        .to_string();
    let id = tool
        .get("toolUseId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let input = tool
        .get("input")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    ToolUse::new(ToolSource::Engine, id, name, input)
}

fn discovered_tool_use(map: &Map<String, Value>) -> ToolUse {
    let debug_data = map.get("debug_data");
    let declared = map
        .get("tool_name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let name = if is_placeholder_name(declared) {
        debug_data
            .and_then(infer_tool_label_for_value)
            .unwrap_or(UNKNOWN_TOOL)
            .to_string()
    } else {
        declared.to_string()
    };
    let input = debug_data
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    ToolUse::new(ToolSource::Discovered, String::new(), name, input)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
