mod event;
mod tool;

pub use event::{ClassifiedEvent, Metadata, Metrics, ToolKey, ToolSource, ToolUse, Usage};
pub use tool::{normalize_tools, ToolDescriptor, DEFAULT_TOOL_DESCRIPTION};
