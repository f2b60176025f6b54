mod recording;
mod sink;
mod terminal;

pub use recording::{RecordingSink, SinkCall};
pub use sink::RenderSink;
pub use terminal::TerminalSink;
