use super::logging::{debug_payload_enabled, emit_debug_payload};
use super::stream::ContentType;
use crate::config::Config;
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use std::pin::Pin;
use std::time::Duration;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// An agent reply whose body has not been read yet.
pub struct AgentResponse {
    pub content_type: ContentType,
    pub body: ByteStream,
}

impl std::fmt::Debug for AgentResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentResponse")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait PromptSubmitter: Send + Sync {
    async fn submit(&self, prompt: &str, session_id: &str) -> Result<AgentResponse>;
}

/// Posts prompts to a hosted agent runtime over HTTP.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    runtime_url: String,
    api_key: Option<String>,
    session_header: String,
}

impl AgentClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            runtime_url: config.runtime_url.clone(),
            api_key: config.api_key.clone(),
            session_header: config.session_header.clone(),
        })
    }
}

#[async_trait]
impl PromptSubmitter for AgentClient {
    async fn submit(&self, prompt: &str, session_id: &str) -> Result<AgentResponse> {
        let payload = json!({ "prompt": prompt });
        if debug_payload_enabled() {
            emit_debug_payload(&self.runtime_url, &payload);
        }
        tracing::debug!(
            url = %self.runtime_url,
            session_id = %session_id,
            prompt_chars = prompt.chars().count(),
            "Submitting prompt"
        );

        let mut request = self
            .http
            .post(&self.runtime_url)
            .header(ACCEPT, "text/event-stream, application/json")
            .header(self.session_header.as_str(), session_id)
            .json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {api_key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|error| map_transport_error(error, &self.runtime_url))?
            .error_for_status()
            .map_err(|error| map_transport_error(error, &self.runtime_url))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ContentType::from_header)
            .unwrap_or(ContentType::Opaque);
        tracing::debug!(content_type = ?content_type, status = %response.status(), "Agent responded");

        let runtime_url = self.runtime_url.clone();
        let body = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_transport_error(error, &runtime_url)));
        Ok(AgentResponse {
            content_type,
            body: Box::pin(body),
        })
    }
}

pub fn map_transport_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local agent runtime '{}': {}. Start the agent or update CORECHAT_RUNTIME_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach agent runtime '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "agent runtime '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        );
    }
    if error.is_body() || error.is_decode() {
        return anyhow!("connection to '{}' dropped mid-stream: {}", request_url, error);
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket
                .write_all(response.as_bytes())
                .await
                .expect("write");
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}/invocations"), handle)
    }

    fn client_for(url: String) -> AgentClient {
        let config = Config {
            runtime_url: url,
            api_key: Some("secret".to_string()),
            ..Config::default()
        };
        AgentClient::new(&config).expect("client")
    }

    #[tokio::test]
    async fn test_submit_sends_prompt_session_header_and_token() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncontent-length: 31\r\n\r\ndata: {\"init_event_loop\":true}\n",
        )
        .await;
        let client = client_for(url);

        let response = client.submit("hello", "session-1").await.expect("submit");
        assert_eq!(response.content_type, ContentType::EventStream);
        let body: Vec<Bytes> = response
            .body
            .map(|chunk| chunk.expect("chunk"))
            .collect()
            .await;
        assert_eq!(body.concat(), b"data: {\"init_event_loop\":true}\n");

        let request = server.await.expect("server").to_ascii_lowercase();
        assert!(request.contains("x-amzn-bedrock-agentcore-runtime-session-id: session-1"));
        assert!(request.contains("authorization: bearer secret"));
        assert!(request.contains("{\"prompt\":\"hello\"}"));
    }

    #[tokio::test]
    async fn test_submit_maps_http_errors() {
        let (url, _server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n",
        )
        .await;
        let client = client_for(url.clone());

        let error = client
            .submit("hello", "session-1")
            .await
            .expect_err("500 must fail");
        let message = error.to_string();
        assert!(message.contains("returned HTTP 500"), "{message}");
        assert!(message.contains(&url), "{message}");
    }

    #[tokio::test]
    async fn test_submit_reports_unreachable_local_runtime() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let client = client_for(format!("http://{addr}/invocations"));

        let error = client
            .submit("hello", "session-1")
            .await
            .expect_err("closed port must fail");
        assert!(error.to_string().contains("cannot reach local agent runtime"));
    }
}
