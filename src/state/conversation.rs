mod core;
mod history;
mod state;
mod streaming;


pub use history::DEFAULT_MAX_HISTORY_MESSAGES;
pub use state::{ChatMessage, ConversationManager, Role};
