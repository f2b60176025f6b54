use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::state::TurnOptions;
use crate::util::{is_local_endpoint_url, parse_bool_flag};

pub const DEFAULT_RUNTIME_URL: &str = "http://localhost:8080/invocations";
pub const DEFAULT_SESSION_HEADER: &str = "X-Amzn-Bedrock-AgentCore-Runtime-Session-Id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub runtime_url: String,
    pub api_key: Option<String>,
    pub session_header: String,
    pub mcp_url: Option<String>,
    pub show_tools: bool,
    pub show_debug: bool,
    pub show_raw: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime_url: DEFAULT_RUNTIME_URL.to_string(),
            api_key: None,
            session_header: DEFAULT_SESSION_HEADER.to_string(),
            mcp_url: None,
            show_tools: true,
            show_debug: false,
            show_raw: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let runtime_url = non_empty_var("CORECHAT_RUNTIME_URL").unwrap_or(defaults.runtime_url);
        let api_key = non_empty_var("CORECHAT_API_KEY");
        let session_header =
            non_empty_var("CORECHAT_SESSION_HEADER").unwrap_or(defaults.session_header);
        let mcp_url = non_empty_var("CORECHAT_MCP_URL");

        Ok(Self {
            runtime_url,
            api_key,
            session_header,
            mcp_url,
            show_tools: bool_var("CORECHAT_SHOW_TOOLS").unwrap_or(defaults.show_tools),
            show_debug: bool_var("CORECHAT_SHOW_DEBUG").unwrap_or(defaults.show_debug),
            show_raw: bool_var("CORECHAT_SHOW_RAW").unwrap_or(defaults.show_raw),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.runtime_url) {
            bail!(
                "Invalid CORECHAT_RUNTIME_URL '{}': expected http:// or https:// URL",
                self.runtime_url
            );
        }

        if let Some(mcp_url) = &self.mcp_url {
            if !is_http_url(mcp_url) {
                bail!(
                    "Invalid CORECHAT_MCP_URL '{}': expected http:// or https:// URL",
                    mcp_url
                );
            }
        }

        if self.session_header.trim().is_empty()
            || self.session_header.contains(|c: char| c.is_whitespace() || c == ':')
        {
            bail!(
                "Invalid CORECHAT_SESSION_HEADER '{}': expected a bare header name",
                self.session_header
            );
        }

        if !self.is_local_endpoint() && self.runtime_url.starts_with("http://") {
            tracing::warn!(url = %self.runtime_url, "Remote agent runtime over plain http");
        }

        Ok(())
    }

    pub fn turn_options(&self) -> TurnOptions {
        TurnOptions {
            show_tool_usage: self.show_tools,
            show_debug: self.show_debug,
            show_raw: self.show_raw,
        }
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.runtime_url)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bool_var(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(parse_bool_flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ENV_LOCK;

    const VARS: [&str; 7] = [
        "CORECHAT_RUNTIME_URL",
        "CORECHAT_API_KEY",
        "CORECHAT_SESSION_HEADER",
        "CORECHAT_MCP_URL",
        "CORECHAT_SHOW_TOOLS",
        "CORECHAT_SHOW_DEBUG",
        "CORECHAT_SHOW_RAW",
    ];

    fn clear_vars() {
        for name in VARS {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_load_defaults() {
        let _guard = ENV_LOCK.blocking_lock();
        clear_vars();

        let config = Config::load().expect("load config");
        assert_eq!(config.runtime_url, DEFAULT_RUNTIME_URL);
        assert_eq!(config.session_header, DEFAULT_SESSION_HEADER);
        assert!(config.api_key.is_none());
        assert!(config.mcp_url.is_none());
        assert_eq!(config.turn_options(), TurnOptions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_reads_environment() {
        let _guard = ENV_LOCK.blocking_lock();
        clear_vars();
        std::env::set_var("CORECHAT_RUNTIME_URL", "https://agent.example.com/invocations");
        std::env::set_var("CORECHAT_API_KEY", "  ");
        std::env::set_var("CORECHAT_MCP_URL", "http://localhost:8000/mcp");
        std::env::set_var("CORECHAT_SHOW_TOOLS", "off");
        std::env::set_var("CORECHAT_SHOW_RAW", "1");
        std::env::set_var("CORECHAT_SHOW_DEBUG", "maybe");

        let config = Config::load().expect("load config");
        clear_vars();

        assert_eq!(config.runtime_url, "https://agent.example.com/invocations");
        assert!(config.api_key.is_none());
        assert_eq!(config.mcp_url.as_deref(), Some("http://localhost:8000/mcp"));
        assert!(!config.show_tools);
        assert!(config.show_raw);
        assert!(!config.show_debug);
    }

    #[test]
    fn test_validate_rejects_bad_urls_and_headers() {
        let config = Config {
            runtime_url: "ftp://agent".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            mcp_url: Some("localhost:8000".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            session_header: "Session Id:".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
