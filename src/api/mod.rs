pub mod classify;
pub mod client;
pub mod logging;
pub mod mock_client;
pub mod stream;

pub use classify::EventClassifier;
pub use client::{AgentClient, AgentResponse, ByteStream, PromptSubmitter};
pub use mock_client::{MockAgentClient, MockResponse};
pub use stream::{ContentType, DecodedUnit, StreamDecoder};
