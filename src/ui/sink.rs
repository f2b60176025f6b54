use crate::state::{DebugEntry, ThinkingStatus, ToolInvocationRecord};
use crate::types::Metadata;
use serde_json::{Map, Value};

/// Output surface for one conversation turn.
///
/// The render driver calls these in stream order and never calls
/// `append_text` after `finalize_text`.
pub trait RenderSink {
    fn show_thinking(&mut self, status: ThinkingStatus);
    fn clear_thinking(&mut self);
    fn open_text(&mut self);
    /// `rendered` is the whole buffer so far, with the in-progress marker.
    fn append_text(&mut self, delta: &str, rendered: &str);
    fn finalize_text(&mut self, text: &str);
    fn create_tool(&mut self, record: &ToolInvocationRecord, input: &Map<String, Value>);
    fn complete_tool(&mut self, record: &ToolInvocationRecord);
    fn show_metadata(&mut self, metadata: &Metadata);
    fn show_error(&mut self, message: &str);
    fn show_raw(&mut self, lines: &[String]);
    fn show_debug(&mut self, entries: &[DebugEntry]);
}
