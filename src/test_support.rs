use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;

/// Process-wide lock for tests that mutate environment variables.
/// Use `.blocking_lock()` in sync tests and `.lock().await` in async tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// An agent-engine event as one `data: ` line.
pub fn engine_event(event: Value) -> String {
    format!("data: {}", json!({ "event": event }))
}

pub fn text_delta_line(text: &str) -> String {
    engine_event(json!({ "contentBlockDelta": { "delta": { "text": text } } }))
}
