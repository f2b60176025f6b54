use crate::types::{normalize_tools, ToolDescriptor};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Opens a tool-discovery session scoped to one agent invocation.
#[async_trait]
pub trait ToolDiscovery: Send + Sync {
    async fn open(&self) -> Result<Box<dyn ToolSession>>;
}

#[async_trait]
pub trait ToolSession: Send {
    /// Raw tool-capability objects as the server reports them.
    async fn list_tools(&mut self) -> Result<Vec<Value>>;
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Lists the session's tools and normalizes them. Failures are logged and
/// yield no tools.
pub async fn discover_tools(session: &mut dyn ToolSession) -> Vec<ToolDescriptor> {
    match session.list_tools().await {
        Ok(raw_tools) => {
            let tools = normalize_tools(&raw_tools);
            let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
            tracing::info!(count = tools.len(), tools = ?names, "Discovered tools");
            tools
        }
        Err(error) => {
            tracing::warn!(error = %error, "Tool listing failed, continuing without tools");
            Vec::new()
        }
    }
}

/// Discovery backed by a fixed tool list. Counts opened and closed sessions.
#[derive(Clone, Default)]
pub struct StaticToolDiscovery {
    tools: Vec<Value>,
    fail_open: bool,
    fail_list: bool,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl StaticToolDiscovery {
    pub fn new(tools: Vec<Value>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }

    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    pub fn failing_list() -> Self {
        Self {
            fail_list: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolDiscovery for StaticToolDiscovery {
    async fn open(&self) -> Result<Box<dyn ToolSession>> {
        if self.fail_open {
            bail!("tool discovery endpoint unavailable");
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticToolSession {
            tools: self.tools.clone(),
            fail_list: self.fail_list,
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct StaticToolSession {
    tools: Vec<Value>,
    fail_list: bool,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl ToolSession for StaticToolSession {
    async fn list_tools(&mut self) -> Result<Vec<Value>> {
        if self.fail_list {
            bail!("tools/list failed");
        }
        Ok(self.tools.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
