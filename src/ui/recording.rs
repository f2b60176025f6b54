use super::RenderSink;
use crate::state::{DebugEntry, ThinkingStatus, ToolInvocationRecord};
use crate::types::Metadata;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    ShowThinking(ThinkingStatus),
    ClearThinking,
    OpenText,
    AppendText {
        delta: String,
        rendered: String,
    },
    FinalizeText(String),
    CreateTool {
        key: String,
        display_name: String,
        input: Map<String, Value>,
    },
    CompleteTool {
        key: String,
        display_name: String,
    },
    ShowMetadata(Metadata),
    ShowError(String),
    ShowRaw(Vec<String>),
    ShowDebug(Vec<DebugEntry>),
}

/// Sink that keeps every call, for headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_tools(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::CreateTool { display_name, .. } => Some(display_name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completed_tools(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::CompleteTool { display_name, .. } => Some(display_name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Last finalized text, if the turn produced any.
    pub fn final_text(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|call| match call {
            SinkCall::FinalizeText(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::ShowError(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RenderSink for RecordingSink {
    fn show_thinking(&mut self, status: ThinkingStatus) {
        self.calls.push(SinkCall::ShowThinking(status));
    }

    fn clear_thinking(&mut self) {
        self.calls.push(SinkCall::ClearThinking);
    }

    fn open_text(&mut self) {
        self.calls.push(SinkCall::OpenText);
    }

    fn append_text(&mut self, delta: &str, rendered: &str) {
        self.calls.push(SinkCall::AppendText {
            delta: delta.to_string(),
            rendered: rendered.to_string(),
        });
    }

    fn finalize_text(&mut self, text: &str) {
        self.calls.push(SinkCall::FinalizeText(text.to_string()));
    }

    fn create_tool(&mut self, record: &ToolInvocationRecord, input: &Map<String, Value>) {
        self.calls.push(SinkCall::CreateTool {
            key: record.key.to_string(),
            display_name: record.display_name.clone(),
            input: input.clone(),
        });
    }

    fn complete_tool(&mut self, record: &ToolInvocationRecord) {
        self.calls.push(SinkCall::CompleteTool {
            key: record.key.to_string(),
            display_name: record.display_name.clone(),
        });
    }

    fn show_metadata(&mut self, metadata: &Metadata) {
        self.calls.push(SinkCall::ShowMetadata(*metadata));
    }

    fn show_error(&mut self, message: &str) {
        self.calls.push(SinkCall::ShowError(message.to_string()));
    }

    fn show_raw(&mut self, lines: &[String]) {
        self.calls.push(SinkCall::ShowRaw(lines.to_vec()));
    }

    fn show_debug(&mut self, entries: &[DebugEntry]) {
        self.calls.push(SinkCall::ShowDebug(entries.to_vec()));
    }
}
