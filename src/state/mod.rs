mod conversation;
mod ledger;
mod render;
mod tool_record;

pub use conversation::{ChatMessage, ConversationManager, Role, DEFAULT_MAX_HISTORY_MESSAGES};
pub use ledger::ToolLedger;
pub use render::{
    DebugEntry, RenderDriver, RenderState, ThinkingStatus, TurnOptions, TurnOutcome,
    IN_PROGRESS_MARKER,
};
pub use tool_record::{tool_display_name, ToolInvocationRecord, ToolStatus};
