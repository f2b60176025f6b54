use super::discovery::{ToolDiscovery, ToolSession};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rmcp::{
    service::{RoleClient, RunningService, ServiceExt},
    transport::StreamableHttpClientTransport,
};
use serde_json::Value;

/// Tool discovery over an MCP streamable-HTTP endpoint.
#[derive(Debug, Clone)]
pub struct McpToolDiscovery {
    url: String,
}

impl McpToolDiscovery {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl ToolDiscovery for McpToolDiscovery {
    async fn open(&self) -> Result<Box<dyn ToolSession>> {
        let transport = StreamableHttpClientTransport::from_uri(self.url.clone());
        let service = ()
            .serve(transport)
            .await
            .with_context(|| format!("failed to connect MCP server '{}'", self.url))?;
        tracing::debug!(url = %self.url, "MCP session opened");
        Ok(Box::new(McpToolSession {
            url: self.url.clone(),
            service,
        }))
    }
}

struct McpToolSession {
    url: String,
    service: RunningService<RoleClient, ()>,
}

#[async_trait]
impl ToolSession for McpToolSession {
    async fn list_tools(&mut self) -> Result<Vec<Value>> {
        let result = self
            .service
            .list_tools(Default::default())
            .await
            .with_context(|| format!("tools/list failed for MCP server '{}'", self.url))?;

        result
            .tools
            .iter()
            .map(|tool| serde_json::to_value(tool).context("failed to serialize MCP tool"))
            .collect()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let Self { url, service } = *self;
        let reason = service
            .cancel()
            .await
            .map_err(|error| anyhow!("failed to close MCP session '{url}': {error}"))?;
        tracing::debug!(url = %url, reason = ?reason, "MCP session closed");
        Ok(())
    }
}
