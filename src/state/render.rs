use super::tool_record::ToolInvocationRecord;
use crate::types::{ClassifiedEvent, Metadata, ToolKey};
use crate::ui::RenderSink;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Appended to the text buffer while the turn is still streaming.
pub const IN_PROGRESS_MARKER: char = '▌';

/// Per-turn display switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOptions {
    pub show_tool_usage: bool,
    pub show_debug: bool,
    pub show_raw: bool,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            show_tool_usage: true,
            show_debug: false,
            show_raw: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingStatus {
    Starting,
    Thinking,
    Processing,
}

impl ThinkingStatus {
    pub fn label(self) -> &'static str {
        match self {
            ThinkingStatus::Starting => "Starting agent...",
            ThinkingStatus::Thinking => "Thinking...",
            ThinkingStatus::Processing => "Running internal processing...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEntry {
    pub label: String,
    pub payload: Value,
}

#[derive(Debug, Default)]
pub struct RenderState {
    pub text_buffer: String,
    pub tools: Vec<ToolInvocationRecord>,
    pub thinking: Option<ThinkingStatus>,
    pub metadata: Option<Metadata>,
    pub stop_reason: Option<String>,
    pub raw: Vec<String>,
    pub errors: Vec<String>,
    pub debug: Vec<DebugEntry>,
    text_started: bool,
    finalized: bool,
}

impl RenderState {
    pub fn tool(&self, key: &ToolKey) -> Option<&ToolInvocationRecord> {
        self.tools.iter().find(|record| &record.key == key)
    }
}

/// What is left of a turn once its stream is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub text: String,
    pub tools: Vec<ToolInvocationRecord>,
    pub metadata: Option<Metadata>,
    pub stop_reason: Option<String>,
    pub errors: Vec<String>,
    pub raw: Vec<String>,
    pub debug: Vec<DebugEntry>,
    pub cancelled: bool,
}

/// Applies classified events, in order, to one turn's render state.
pub struct RenderDriver<'a, S: RenderSink + ?Sized> {
    sink: &'a mut S,
    options: TurnOptions,
    state: RenderState,
}

impl<'a, S: RenderSink + ?Sized> RenderDriver<'a, S> {
    pub fn new(sink: &'a mut S, options: TurnOptions) -> Self {
        Self {
            sink,
            options,
            state: RenderState::default(),
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn apply(&mut self, event: ClassifiedEvent) {
        match event {
            ClassifiedEvent::Init { payload } => {
                self.show_thinking(ThinkingStatus::Starting);
                self.push_debug("Agent starting", payload);
            }
            ClassifiedEvent::MessageStart { payload } => {
                self.show_thinking(ThinkingStatus::Thinking);
                self.push_debug("Message started", payload);
            }
            ClassifiedEvent::ToolUse(tool) => {
                if !self.options.show_tool_usage || self.state.tool(&tool.key).is_some() {
                    return;
                }
                self.clear_thinking();
                let mut record = ToolInvocationRecord::new(&tool);
                record.activate();
                self.sink.create_tool(&record, &tool.input);
                self.state.tools.push(record);
            }
            ClassifiedEvent::ToolComplete { key } => {
                let Some(key) = key else {
                    return;
                };
                if let Some(record) = self
                    .state
                    .tools
                    .iter_mut()
                    .find(|record| record.key == key && record.is_active())
                {
                    record.complete();
                    self.sink.complete_tool(record);
                }
            }
            ClassifiedEvent::Internal { payload } => {
                if !self.state.text_started {
                    self.show_thinking(ThinkingStatus::Processing);
                }
                self.push_debug("Internal processing", payload);
            }
            ClassifiedEvent::TextDelta { text } => self.append_text(&text),
            ClassifiedEvent::Metadata(metadata) => self.state.metadata = Some(metadata),
            ClassifiedEvent::MessageStop { stop_reason } => {
                let label = format!("Message complete (reason: {stop_reason})");
                self.push_debug(&label, json!({ "stopReason": stop_reason }));
                self.state.stop_reason = Some(stop_reason);
            }
            ClassifiedEvent::Error { message } => {
                self.sink.show_error(&message);
                self.state.errors.push(message);
            }
            ClassifiedEvent::Raw { line } => self.state.raw.push(line),
        }
    }

    /// Renders the text buffer without the in-progress marker. Calling it
    /// again leaves the buffer and the sink untouched.
    pub fn finalize_text(&mut self) -> &str {
        if !self.state.finalized {
            self.state.finalized = true;
            if self.state.text_started {
                self.sink.finalize_text(&self.state.text_buffer);
            }
        }
        &self.state.text_buffer
    }

    pub fn finish(mut self) -> TurnOutcome {
        self.finalize_text();

        for record in self.state.tools.iter_mut().filter(|record| record.is_active()) {
            record.complete();
            self.sink.complete_tool(record);
        }
        self.clear_thinking();

        if self.options.show_debug && !self.state.debug.is_empty() {
            self.sink.show_debug(&self.state.debug);
        }
        if let Some(metadata) = &self.state.metadata {
            self.sink.show_metadata(metadata);
        }
        if self.options.show_raw && !self.state.raw.is_empty() {
            self.sink.show_raw(&self.state.raw);
        }

        let state = self.state;
        TurnOutcome {
            text: state.text_buffer,
            tools: state.tools,
            metadata: state.metadata,
            stop_reason: state.stop_reason,
            errors: state.errors,
            raw: state.raw,
            debug: state.debug,
            cancelled: false,
        }
    }

    fn append_text(&mut self, text: &str) {
        if self.state.finalized {
            tracing::warn!(delta_length = text.len(), "Text delta after finalization ignored");
            return;
        }
        if !self.state.text_started {
            self.clear_thinking();
            self.sink.open_text();
            self.state.text_started = true;
        }
        self.state.text_buffer.push_str(text);
        let rendered = format!("{}{IN_PROGRESS_MARKER}", self.state.text_buffer);
        self.sink.append_text(text, &rendered);
    }

    fn show_thinking(&mut self, status: ThinkingStatus) {
        if self.state.thinking != Some(status) {
            self.state.thinking = Some(status);
            self.sink.show_thinking(status);
        }
    }

    fn clear_thinking(&mut self) {
        if self.state.thinking.take().is_some() {
            self.sink.clear_thinking();
        }
    }

    fn push_debug(&mut self, label: &str, payload: Value) {
        if self.options.show_debug {
            self.state.debug.push(DebugEntry {
                label: label.to_string(),
                payload,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ToolStatus;
    use crate::types::{ToolSource, ToolUse, Usage};
    use crate::ui::{RecordingSink, SinkCall};
    use serde_json::Map;

    fn tool(id: &str, name: &str) -> ClassifiedEvent {
        ClassifiedEvent::ToolUse(ToolUse::new(
            ToolSource::Engine,
            id.to_string(),
            name.to_string(),
            Map::new(),
        ))
    }

    fn key(id: &str, name: &str) -> ToolKey {
        ToolKey::derive(id, ToolSource::Engine, name)
    }

    #[test]
    fn test_thinking_indicator_transitions() {
        let mut sink = RecordingSink::default();
        let mut driver = RenderDriver::new(&mut sink, TurnOptions::default());
        driver.apply(ClassifiedEvent::Init { payload: json!({}) });
        driver.apply(ClassifiedEvent::Init { payload: json!({}) });
        driver.apply(ClassifiedEvent::MessageStart { payload: json!({}) });
        assert_eq!(driver.state().thinking, Some(ThinkingStatus::Thinking));
        driver.apply(ClassifiedEvent::text("Hi"));
        assert_eq!(driver.state().thinking, None);
        driver.finish();

        assert_eq!(
            sink.calls,
            vec![
                SinkCall::ShowThinking(ThinkingStatus::Starting),
                SinkCall::ShowThinking(ThinkingStatus::Thinking),
                SinkCall::ClearThinking,
                SinkCall::OpenText,
                SinkCall::AppendText {
                    delta: "Hi".to_string(),
                    rendered: "Hi▌".to_string()
                },
                SinkCall::FinalizeText("Hi".to_string()),
            ]
        );
    }

    #[test]
    fn test_internal_shows_processing_only_before_text() {
        let mut sink = RecordingSink::default();
        let mut driver = RenderDriver::new(&mut sink, TurnOptions::default());
        driver.apply(ClassifiedEvent::Internal { payload: json!("x") });
        assert_eq!(driver.state().thinking, Some(ThinkingStatus::Processing));
        driver.apply(ClassifiedEvent::text("a"));
        driver.apply(ClassifiedEvent::Internal { payload: json!("x") });
        assert_eq!(driver.state().thinking, None);
    }

    #[test]
    fn test_tool_lifecycle_and_duplicate_keys() {
        let mut sink = RecordingSink::default();
        let mut driver = RenderDriver::new(&mut sink, TurnOptions::default());
        driver.apply(ClassifiedEvent::MessageStart { payload: json!({}) });
        driver.apply(tool("t1", "aws___search_documentation"));
        driver.apply(tool("t1", "aws___search_documentation"));
        assert_eq!(driver.state().tools.len(), 1);
        assert_eq!(driver.state().thinking, None);

        driver.apply(ClassifiedEvent::ToolComplete {
            key: Some(key("t1", "aws___search_documentation")),
        });
        driver.apply(ClassifiedEvent::ToolComplete {
            key: Some(key("t1", "aws___search_documentation")),
        });
        let outcome = driver.finish();

        assert_eq!(outcome.tools[0].status, ToolStatus::Complete);
        assert_eq!(sink.created_tools(), vec!["Searching AWS documentation".to_string()]);
        assert_eq!(
            sink.completed_tools(),
            vec!["Searching AWS documentation".to_string()]
        );
    }

    #[test]
    fn test_completion_for_unknown_key_is_ignored() {
        let mut sink = RecordingSink::default();
        let mut driver = RenderDriver::new(&mut sink, TurnOptions::default());
        driver.apply(ClassifiedEvent::ToolComplete {
            key: Some(key("t1", "calc")),
        });
        driver.apply(ClassifiedEvent::ToolComplete { key: None });
        driver.apply(tool("t1", "calc"));
        assert!(driver.state().tool(&key("t1", "calc")).is_some_and(|r| r.is_active()));
        driver.finish();
        assert_eq!(sink.completed_tools(), vec!["Running calc".to_string()]);
    }

    #[test]
    fn test_hidden_tool_usage_creates_no_records() {
        let mut sink = RecordingSink::default();
        let options = TurnOptions {
            show_tool_usage: false,
            ..TurnOptions::default()
        };
        let mut driver = RenderDriver::new(&mut sink, options);
        driver.apply(tool("t1", "calc"));
        driver.apply(ClassifiedEvent::ToolComplete {
            key: Some(key("t1", "calc")),
        });
        let outcome = driver.finish();
        assert!(outcome.tools.is_empty());
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_finish_force_completes_active_tools_and_shows_metadata_last() {
        let mut sink = RecordingSink::default();
        let mut driver = RenderDriver::new(&mut sink, TurnOptions::default());
        let metadata = Metadata {
            usage: Usage {
                input_tokens: 1,
                output_tokens: 2,
                total_tokens: 3,
            },
            ..Metadata::default()
        };
        driver.apply(ClassifiedEvent::Metadata(metadata));
        driver.apply(tool("t1", "calc"));
        let outcome = driver.finish();

        assert_eq!(outcome.metadata, Some(metadata));
        assert_eq!(sink.calls.last(), Some(&SinkCall::ShowMetadata(metadata)));
        let metadata_calls = sink
            .calls
            .iter()
            .filter(|call| matches!(call, SinkCall::ShowMetadata(_)))
            .count();
        assert_eq!(metadata_calls, 1);
        assert_eq!(outcome.tools[0].status, ToolStatus::Complete);
    }

    #[test]
    fn test_finalize_text_is_idempotent() {
        let mut sink = RecordingSink::default();
        let mut driver = RenderDriver::new(&mut sink, TurnOptions::default());
        driver.apply(ClassifiedEvent::text("Hello"));
        driver.apply(ClassifiedEvent::text(", world"));
        let first = driver.finalize_text().to_string();
        let second = driver.finalize_text().to_string();
        assert_eq!(first, "Hello, world");
        assert_eq!(first, second);
        driver.apply(ClassifiedEvent::text("late"));
        let outcome = driver.finish();
        assert_eq!(outcome.text, "Hello, world");

        let finalize_calls = sink
            .calls
            .iter()
            .filter(|call| matches!(call, SinkCall::FinalizeText(_)))
            .count();
        assert_eq!(finalize_calls, 1);
    }

    #[test]
    fn test_error_keeps_partial_text() {
        let mut sink = RecordingSink::default();
        let mut driver = RenderDriver::new(&mut sink, TurnOptions::default());
        driver.apply(ClassifiedEvent::text("partial"));
        driver.apply(ClassifiedEvent::error("Error: connection reset"));
        let outcome = driver.finish();
        assert_eq!(outcome.text, "partial");
        assert_eq!(outcome.errors, vec!["Error: connection reset".to_string()]);
        assert!(sink
            .calls
            .contains(&SinkCall::ShowError("Error: connection reset".to_string())));
    }

    #[test]
    fn test_debug_and_raw_are_shown_only_when_enabled() {
        let mut sink = RecordingSink::default();
        let mut driver = RenderDriver::new(&mut sink, TurnOptions::default());
        driver.apply(ClassifiedEvent::Raw {
            line: "RAW LINE: x".to_string(),
        });
        driver.apply(ClassifiedEvent::MessageStop {
            stop_reason: "end_turn".to_string(),
        });
        let outcome = driver.finish();
        assert_eq!(outcome.raw.len(), 1);
        assert!(outcome.debug.is_empty());
        assert!(sink.calls.is_empty());

        let mut sink = RecordingSink::default();
        let options = TurnOptions {
            show_tool_usage: true,
            show_debug: true,
            show_raw: true,
        };
        let mut driver = RenderDriver::new(&mut sink, options);
        driver.apply(ClassifiedEvent::Raw {
            line: "RAW LINE: x".to_string(),
        });
        driver.apply(ClassifiedEvent::MessageStop {
            stop_reason: "end_turn".to_string(),
        });
        let outcome = driver.finish();
        assert_eq!(outcome.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(outcome.debug[0].label, "Message complete (reason: end_turn)");
        assert!(sink.calls.contains(&SinkCall::ShowRaw(vec!["RAW LINE: x".to_string()])));
        assert!(sink
            .calls
            .iter()
            .any(|call| matches!(call, SinkCall::ShowDebug(entries) if entries.len() == 1)));
    }
}
