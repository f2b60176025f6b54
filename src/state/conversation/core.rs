use super::streaming::{StreamEnd, TurnPipeline};
use super::ConversationManager;
use crate::api::{EventClassifier, StreamDecoder};
use crate::mcp::{discover_tools, ToolSession};
use crate::state::{RenderDriver, TurnOutcome};
use crate::types::ClassifiedEvent;
use crate::ui::RenderSink;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

impl ConversationManager {
    /// Runs one prompt through the agent and renders the reply into `sink`.
    ///
    /// Failures never escape: they end up as error events in the outcome. The
    /// finalized assistant text, partial or not, is appended to the history.
    pub async fn run_turn(
        &mut self,
        prompt: &str,
        sink: &mut dyn RenderSink,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        self.push_user_message(prompt.to_string());
        let mut driver = RenderDriver::new(sink, self.options);
        let session = self.open_discovery_session().await;

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.submitter.submit(prompt, &self.session_id) => Some(result),
        };

        let end = match submitted {
            None => StreamEnd::Cancelled,
            Some(Err(error)) => {
                tracing::warn!(error = %error, session_id = %self.session_id, "Prompt submission failed");
                driver.apply(ClassifiedEvent::error(format!("Error: {error:#}")));
                StreamEnd::TransportError
            }
            Some(Ok(response)) => {
                tracing::debug!(content_type = ?response.content_type, "Streaming agent response");
                let mut pipeline = TurnPipeline {
                    decoder: StreamDecoder::new(response.content_type),
                    classifier: EventClassifier::new(self.options.show_raw),
                };
                let mut body = response.body;
                pipeline.pump(&mut body, &mut driver, cancel).await
            }
        };

        if let Some(session) = session {
            if let Err(error) = session.close().await {
                tracing::warn!(error = %error, "Failed to close tool discovery session");
            }
        }

        let mut outcome = driver.finish();
        outcome.cancelled = end == StreamEnd::Cancelled;
        tracing::info!(
            session_id = %self.session_id,
            text_chars = outcome.text.chars().count(),
            tools = outcome.tools.len(),
            errors = outcome.errors.len(),
            cancelled = outcome.cancelled,
            "Turn finished"
        );
        self.push_assistant_message(outcome.text.clone());
        outcome
    }

    async fn open_discovery_session(&mut self) -> Option<Box<dyn ToolSession>> {
        let discovery = Arc::clone(self.discovery.as_ref()?);
        match discovery.open().await {
            Ok(mut session) => {
                self.discovered_tools = discover_tools(session.as_mut()).await;
                Some(session)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Tool discovery failed, continuing without tools");
                self.discovered_tools.clear();
                None
            }
        }
    }
}
