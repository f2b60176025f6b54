mod client;
mod discovery;

pub use client::McpToolDiscovery;
pub use discovery::{discover_tools, StaticToolDiscovery, ToolDiscovery, ToolSession};
