use crate::types::{ToolKey, ToolSource, ToolUse};
use serde::{Deserialize, Serialize};

const AWS_TOOL_PREFIX: &str = "aws___";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Pending,
    Active,
    Complete,
}

/// Render-side lifecycle of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInvocationRecord {
    pub key: ToolKey,
    pub name: String,
    pub display_name: String,
    pub source: ToolSource,
    pub status: ToolStatus,
}

impl ToolInvocationRecord {
    pub fn new(tool: &ToolUse) -> Self {
        Self {
            key: tool.key.clone(),
            name: tool.name.clone(),
            display_name: tool_display_name(&tool.name),
            source: tool.source,
            status: ToolStatus::Pending,
        }
    }

    pub fn activate(&mut self) {
        if self.status == ToolStatus::Pending {
            self.status = ToolStatus::Active;
        }
    }

    /// Returns true only on the transition into `Complete`.
    pub fn complete(&mut self) -> bool {
        if self.status == ToolStatus::Complete {
            return false;
        }
        self.status = ToolStatus::Complete;
        true
    }

    pub fn is_active(&self) -> bool {
        self.status == ToolStatus::Active
    }
}

/// Progress label shown while a tool runs.
pub fn tool_display_name(name: &str) -> String {
    let Some(rest) = name.strip_prefix(AWS_TOOL_PREFIX) else {
        return format!("Running {name}");
    };

    if rest.contains("search_documentation") {
        "Searching AWS documentation".to_string()
    } else if rest.contains("read_documentation") {
        "Reading AWS documentation".to_string()
    } else if rest.contains("recommend") {
        "Fetching AWS documentation recommendations".to_string()
    } else {
        format!("Running AWS tool: {rest}")
    }
}
