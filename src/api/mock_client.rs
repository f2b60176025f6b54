use super::client::{AgentResponse, PromptSubmitter};
use super::stream::ContentType;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One scripted agent reply.
#[derive(Debug, Clone)]
pub struct MockResponse {
    content_type: ContentType,
    chunks: Vec<std::result::Result<String, String>>,
    submit_error: Option<String>,
}

impl MockResponse {
    /// Event-stream reply; each line becomes one `\n\n`-framed chunk.
    pub fn event_stream<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks = lines
            .into_iter()
            .map(|line| {
                let line = line.into();
                let framed = if line.ends_with("\n\n") {
                    line
                } else {
                    format!("{line}\n\n")
                };
                Ok(framed)
            })
            .collect();
        Self {
            content_type: ContentType::EventStream,
            chunks,
            submit_error: None,
        }
    }

    pub fn json(body: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::JsonDocument,
            chunks: vec![Ok(body.into())],
            submit_error: None,
        }
    }

    pub fn opaque(body: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Opaque,
            chunks: vec![Ok(body.into())],
            submit_error: None,
        }
    }

    /// Reply whose submission fails before any body is produced.
    pub fn submit_failure(message: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Opaque,
            chunks: Vec::new(),
            submit_error: Some(message.into()),
        }
    }

    /// Drops the connection after the chunks scripted so far.
    pub fn with_transport_error(mut self, message: impl Into<String>) -> Self {
        self.chunks.push(Err(message.into()));
        self
    }
}

/// Replays scripted responses in order and records what was submitted.
#[derive(Clone, Default)]
pub struct MockAgentClient {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    submissions: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAgentClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            submissions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push(&self, response: MockResponse) {
        self.responses.lock().await.push_back(response);
    }

    /// `(prompt, session_id)` pairs in submission order.
    pub async fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl PromptSubmitter for MockAgentClient {
    async fn submit(&self, prompt: &str, session_id: &str) -> Result<AgentResponse> {
        self.submissions
            .lock()
            .await
            .push((prompt.to_string(), session_id.to_string()));

        let Some(response) = self.responses.lock().await.pop_front() else {
            bail!("MockAgentClient: No more responses configured");
        };
        if let Some(message) = response.submit_error {
            bail!(message);
        }

        let chunks: Vec<Result<Bytes>> = response
            .chunks
            .into_iter()
            .map(|chunk| chunk.map(Bytes::from).map_err(|message| anyhow!(message)))
            .collect();
        Ok(AgentResponse {
            content_type: response.content_type,
            body: Box::pin(stream::iter(chunks)),
        })
    }
}
