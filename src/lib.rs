pub mod api;
pub mod cli;
pub mod config;
pub mod entrypoint;
pub mod mcp;
pub mod state;
#[cfg(test)]
pub mod test_support;
pub mod tool_hint;
pub mod types;
pub mod ui;
pub mod util;
