use crate::api::{ByteStream, DecodedUnit, EventClassifier, StreamDecoder};
use crate::state::RenderDriver;
use crate::types::ClassifiedEvent;
use crate::ui::RenderSink;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StreamEnd {
    Exhausted,
    TransportError,
    Cancelled,
}

/// One turn's decode, classify and render pipeline.
pub(super) struct TurnPipeline {
    pub(super) decoder: StreamDecoder,
    pub(super) classifier: EventClassifier,
}

impl TurnPipeline {
    /// Pulls chunks until the body ends, fails, or the turn is cancelled.
    /// Every chunk is fully rendered before the next one is awaited.
    pub(super) async fn pump<S: RenderSink + ?Sized>(
        &mut self,
        body: &mut ByteStream,
        driver: &mut RenderDriver<'_, S>,
        cancel: &CancellationToken,
    ) -> StreamEnd {
        let mut chunks = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(chunks, "Turn cancelled mid-stream");
                    return StreamEnd::Cancelled;
                }
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    chunks += 1;
                    let units = self.decoder.process(&chunk);
                    self.apply(units, driver);
                }
                Some(Err(error)) => {
                    tracing::warn!(error = %error, chunks, "Agent stream failed");
                    driver.apply(ClassifiedEvent::error(format!("Error: {error:#}")));
                    return StreamEnd::TransportError;
                }
                None => {
                    let units = self.decoder.finish();
                    self.apply(units, driver);
                    tracing::debug!(chunks, "Agent stream exhausted");
                    return StreamEnd::Exhausted;
                }
            }
        }
    }

    fn apply<S: RenderSink + ?Sized>(
        &mut self,
        units: Vec<DecodedUnit>,
        driver: &mut RenderDriver<'_, S>,
    ) {
        for unit in units {
            for event in self.classifier.classify(&unit) {
                driver.apply(event);
            }
        }
    }
}
