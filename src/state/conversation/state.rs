use super::history::DEFAULT_MAX_HISTORY_MESSAGES;
use crate::api::PromptSubmitter;
use crate::mcp::ToolDiscovery;
use crate::state::TurnOptions;
use crate::types::ToolDescriptor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Owns the session and its chat history, and runs one turn at a time.
pub struct ConversationManager {
    pub(super) submitter: Arc<dyn PromptSubmitter>,
    pub(super) discovery: Option<Arc<dyn ToolDiscovery>>,
    pub(super) session_id: String,
    pub(super) history: Vec<ChatMessage>,
    pub(super) max_history: usize,
    pub(super) options: TurnOptions,
    pub(super) discovered_tools: Vec<ToolDescriptor>,
}

impl ConversationManager {
    pub fn new(submitter: Arc<dyn PromptSubmitter>) -> Self {
        Self {
            submitter,
            discovery: None,
            session_id: new_session_id(),
            history: Vec::new(),
            max_history: DEFAULT_MAX_HISTORY_MESSAGES,
            options: TurnOptions::default(),
            discovered_tools: Vec::new(),
        }
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn ToolDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn with_options(mut self, options: TurnOptions) -> Self {
        self.options = options;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// First eight characters of the session id, for status lines.
    pub fn short_session_id(&self) -> &str {
        self.session_id
            .char_indices()
            .nth(8)
            .map_or(self.session_id.as_str(), |(end, _)| &self.session_id[..end])
    }

    pub fn options(&self) -> TurnOptions {
        self.options
    }

    pub fn options_mut(&mut self) -> &mut TurnOptions {
        &mut self.options
    }

    /// Tools listed during the most recent turn.
    pub fn discovered_tools(&self) -> &[ToolDescriptor] {
        &self.discovered_tools
    }

    /// Starts over with a fresh session id and an empty history.
    pub fn new_session(&mut self) {
        self.session_id = new_session_id();
        self.history.clear();
        self.discovered_tools.clear();
        tracing::info!(session_id = %self.session_id, "Started new session");
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
