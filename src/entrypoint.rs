//! Backend side of the chat: runs an agent with discovered tools and frames
//! its events as an event stream.

use crate::api::{AgentResponse, ByteStream, ContentType, PromptSubmitter};
use crate::mcp::{discover_tools, ToolDiscovery};
use crate::tool_hint::{infer_tool_label_for_value, is_placeholder_name};
use crate::types::ToolDescriptor;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::{json, Map, Value};
use std::pin::Pin;
use std::sync::Arc;

pub const DEFAULT_PROMPT: &str =
    "No prompt found in input, please guide customer to create a json payload with prompt key";

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Value>> + Send>>;

/// The agent engine: streams loosely-structured events for one prompt.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn stream(&self, prompt: &str, tools: &[ToolDescriptor]) -> Result<EventStream>;
}

#[derive(Clone)]
pub struct AgentEntrypoint {
    runtime: Arc<dyn AgentRuntime>,
    discovery: Arc<dyn ToolDiscovery>,
}

impl AgentEntrypoint {
    pub fn new(runtime: Arc<dyn AgentRuntime>, discovery: Arc<dyn ToolDiscovery>) -> Self {
        Self { runtime, discovery }
    }

    /// Runs one invocation. A discovery session is opened for it and closed
    /// once the agent stream ends or fails.
    pub fn invoke(&self, payload: &Value) -> EventStream {
        let prompt = payload
            .get("prompt")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROMPT)
            .to_string();
        let runtime = Arc::clone(&self.runtime);
        let discovery = Arc::clone(&self.discovery);

        Box::pin(async_stream::stream! {
            tracing::info!(prompt = %prompt, "Processing user message");
            let mut session = match discovery.open().await {
                Ok(session) => session,
                Err(error) => {
                    yield Err(error);
                    return;
                }
            };
            let tools = discover_tools(session.as_mut()).await;

            match runtime.stream(&prompt, &tools).await {
                Ok(mut events) => {
                    while let Some(item) = events.next().await {
                        match item {
                            Ok(event) => {
                                tracing::debug!(event = %event, "Agent event");
                                if let Some(tool_name) = detect_tool_name(&event) {
                                    tracing::info!(tool = %tool_name, "Tool detected");
                                    yield Ok(json!({
                                        "tool_name": tool_name,
                                        "type": "tool_use",
                                        "debug_data": event.clone(),
                                    }));
                                }
                                yield Ok(event);
                            }
                            Err(error) => {
                                yield Err(error);
                                break;
                            }
                        }
                    }
                }
                Err(error) => {
                    yield Err(error);
                }
            }

            if let Err(error) = session.close().await {
                tracing::warn!(error = %error, "Failed to close tool discovery session");
            }
        })
    }
}

#[async_trait]
impl PromptSubmitter for AgentEntrypoint {
    async fn submit(&self, prompt: &str, session_id: &str) -> Result<AgentResponse> {
        tracing::debug!(session_id = %session_id, "In-process agent invocation");
        let events = self.invoke(&json!({ "prompt": prompt }));
        Ok(AgentResponse {
            content_type: ContentType::EventStream,
            body: sse_frames(events),
        })
    }
}

/// Finds the name of the tool an agent event refers to, if any.
///
/// Structural fields win; the keyword heuristic only runs for events that
/// carry no tool structure at all.
pub fn detect_tool_name(event: &Value) -> Option<String> {
    let map = event.as_object()?;
    let serialized = event.to_string().to_ascii_lowercase();

    let name = if map.get("type").and_then(Value::as_str) == Some("tool_use")
        || serialized.contains("tool_use")
    {
        first_name(map, &["name", "tool_name", "function_name"])
    } else if let Some(tool) = map.get("tool").and_then(Value::as_object) {
        first_name(tool, &["name", "tool_name", "function"])
    } else {
        infer_tool_label_for_value(event).map(str::to_string)
    };

    name.filter(|name| !is_placeholder_name(name))
}

fn first_name(map: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    let value = fields.iter().find_map(|field| map.get(*field))?;
    match value {
        Value::Null => None,
        Value::String(name) => Some(name.clone()),
        other => Some(other.to_string()),
    }
}

/// One event-stream frame: `data: <json>\n\n`.
pub fn sse_frame(value: &Value) -> String {
    format!("data: {value}\n\n")
}

pub fn sse_frames(events: EventStream) -> ByteStream {
    Box::pin(events.map(|item| item.map(|value| Bytes::from(sse_frame(&value)))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::StaticToolDiscovery;
    use anyhow::anyhow;
    use futures::stream;
    use std::sync::Mutex;

    struct ScriptedRuntime {
        events: Vec<Value>,
        fail_after: bool,
        seen: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedRuntime {
        fn new(events: Vec<Value>) -> Self {
            Self {
                events,
                fail_after: false,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentRuntime for ScriptedRuntime {
        async fn stream(&self, prompt: &str, tools: &[ToolDescriptor]) -> Result<EventStream> {
            self.seen
                .lock()
                .expect("seen lock")
                .push((prompt.to_string(), tools.len()));
            let mut items: Vec<Result<Value>> = self.events.iter().cloned().map(Ok).collect();
            if self.fail_after {
                items.push(Err(anyhow!("model stream failed")));
            }
            Ok(Box::pin(stream::iter(items)))
        }
    }

    #[test]
    fn test_detect_tool_name_prefers_structure() {
        assert_eq!(
            detect_tool_name(&json!({"type": "tool_use", "name": "aws___read_documentation"})),
            Some("aws___read_documentation".to_string())
        );
        assert_eq!(
            detect_tool_name(&json!({"tool": {"tool_name": "calculator"}})),
            Some("calculator".to_string())
        );
        assert_eq!(
            detect_tool_name(&json!({"note": "aws documentation search"})),
            Some("AWS Documentation Search".to_string())
        );
    }

    #[test]
    fn test_detect_tool_name_rejects_placeholders_and_plain_events() {
        assert_eq!(detect_tool_name(&json!({"type": "tool_use"})), None);
        assert_eq!(
            detect_tool_name(&json!({"tool": {"name": "Unknown Tool"}})),
            None
        );
        assert_eq!(detect_tool_name(&json!({"data": "hello"})), None);
        assert_eq!(detect_tool_name(&json!("tool_use")), None);
    }

    #[test]
    fn test_sse_frame() {
        assert_eq!(sse_frame(&json!({"data": "hi"})), "data: {\"data\":\"hi\"}\n\n");
    }

    #[tokio::test]
    async fn test_invoke_annotates_tool_events_and_closes_session() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![
            json!({"data": "Looking that up"}),
            json!({"tool": {"name": "aws___search_documentation"}}),
        ]));
        let discovery = StaticToolDiscovery::new(vec![json!({"name": "aws___search_documentation"})]);
        let entrypoint = AgentEntrypoint::new(runtime.clone(), Arc::new(discovery.clone()));

        let events: Vec<Value> = entrypoint
            .invoke(&json!({"prompt": "find s3 docs"}))
            .map(|item| item.expect("event"))
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[1]["type"], "tool_use");
        assert_eq!(events[1]["tool_name"], "aws___search_documentation");
        assert_eq!(events[1]["debug_data"], events[2]);
        assert_eq!(
            runtime.seen.lock().expect("seen lock").as_slice(),
            &[("find s3 docs".to_string(), 1)]
        );
        assert_eq!((discovery.opened(), discovery.closed()), (1, 1));
    }

    #[tokio::test]
    async fn test_invoke_uses_default_prompt_and_closes_on_failure() {
        let runtime = Arc::new(ScriptedRuntime {
            fail_after: true,
            ..ScriptedRuntime::new(vec![json!({"data": "partial"})])
        });
        let discovery = StaticToolDiscovery::new(Vec::new());
        let entrypoint = AgentEntrypoint::new(runtime.clone(), Arc::new(discovery.clone()));

        let items: Vec<Result<Value>> = entrypoint.invoke(&json!({})).collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        assert_eq!(runtime.seen.lock().expect("seen lock")[0].0, DEFAULT_PROMPT);
        assert_eq!(discovery.closed(), 1);
    }

    #[tokio::test]
    async fn test_invoke_surfaces_discovery_failure() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![json!({"data": "x"})]));
        let entrypoint =
            AgentEntrypoint::new(runtime.clone(), Arc::new(StaticToolDiscovery::failing_open()));
        let items: Vec<Result<Value>> = entrypoint.invoke(&json!({"prompt": "p"})).collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
        assert!(runtime.seen.lock().expect("seen lock").is_empty());
    }
}
