use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TOOL_DESCRIPTION: &str = "No description available";

/// A tool offered to the agent for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<String>,
}

impl ToolDescriptor {
    /// Normalizes a raw capability object from a discovery call.
    ///
    /// Accepts both `name` and `tool_name`, and both `inputSchema` and
    /// `input_schema`. Returns `None` only when no usable name is present.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let name = ["name", "tool_name"]
            .iter()
            .find_map(|field| raw.get(field).and_then(Value::as_str))
            .map(str::trim)
            .filter(|name| !name.is_empty())?
            .to_string();

        let description = raw
            .get("description")
            .and_then(Value::as_str)
            .filter(|description| !description.trim().is_empty())
            .unwrap_or(DEFAULT_TOOL_DESCRIPTION)
            .to_string();

        let input_schema = ["inputSchema", "input_schema"]
            .iter()
            .find_map(|field| raw.get(field))
            .filter(|schema| !schema.is_null())
            .map(|schema| match schema {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            });

        Some(Self {
            name,
            description,
            input_schema,
        })
    }
}

/// Normalizes every raw descriptor, skipping the nameless ones.
pub fn normalize_tools(raw_tools: &[Value]) -> Vec<ToolDescriptor> {
    raw_tools
        .iter()
        .filter_map(|raw| {
            let descriptor = ToolDescriptor::from_raw(raw);
            if descriptor.is_none() {
                tracing::debug!(raw = %raw, "Skipping tool descriptor without a name");
            }
            descriptor
        })
        .collect()
}
