use corechat::config::{Config, DEFAULT_RUNTIME_URL};

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    assert_eq!(config.runtime_url, DEFAULT_RUNTIME_URL);
    assert!(config.validate().is_ok());
    assert!(config.is_local_endpoint());
}

#[test]
fn test_config_validation_rejects_non_http_runtime() {
    let config = Config {
        runtime_url: "bedrock://agent".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_allows_remote_runtime_with_token() {
    let config = Config {
        runtime_url: "https://agent.example.com/invocations".to_string(),
        api_key: Some("token".to_string()),
        mcp_url: Some("https://knowledge-mcp.global.api.aws".to_string()),
        ..Config::default()
    };
    assert!(config.validate().is_ok());
    assert!(!config.is_local_endpoint());
}
