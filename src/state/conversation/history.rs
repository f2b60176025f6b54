use super::{ChatMessage, ConversationManager, Role};

pub const DEFAULT_MAX_HISTORY_MESSAGES: usize = 200;

impl ConversationManager {
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Caps the history at `max_messages`, dropping the oldest first.
    pub fn with_history_limit(mut self, max_messages: usize) -> Self {
        self.max_history = max_messages.max(2);
        self.prune_history();
        self
    }

    pub(super) fn push_user_message(&mut self, content: String) {
        self.push_message(Role::User, content);
    }

    pub(super) fn push_assistant_message(&mut self, content: String) {
        self.push_message(Role::Assistant, content);
    }

    fn push_message(&mut self, role: Role, content: String) {
        self.history.push(ChatMessage { role, content });
        self.prune_history();
    }

    fn prune_history(&mut self) {
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }
}
