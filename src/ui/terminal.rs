use super::RenderSink;
use crate::state::{DebugEntry, ThinkingStatus, ToolInvocationRecord, IN_PROGRESS_MARKER};
use crate::types::Metadata;
use crate::util::preview;
use crossterm::{
    cursor::MoveLeft,
    queue,
    style::{Print, PrintStyledContent, Stylize},
    terminal::{Clear, ClearType},
};
use serde_json::{Map, Value};
use std::io::{self, Write};

const INPUT_PREVIEW_CHARS: usize = 120;

/// Line-oriented sink for a terminal or a plain pipe.
///
/// With `interactive` off no cursor movement is emitted, so the thinking
/// indicator and the in-progress marker are skipped.
pub struct TerminalSink<W: Write> {
    out: W,
    interactive: bool,
    marker_visible: bool,
    thinking_visible: bool,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout(interactive: bool) -> Self {
        Self::new(io::stdout(), interactive)
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            marker_visible: false,
            thinking_visible: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_with(&mut self, op: impl FnOnce(&mut W) -> io::Result<()>) {
        let result = op(&mut self.out).and_then(|()| self.out.flush());
        if let Err(err) = result {
            tracing::warn!(error = %err, "Terminal write failed");
        }
    }

    fn erase_marker(&mut self) {
        if self.marker_visible {
            self.marker_visible = false;
            self.write_with(|out| queue!(out, MoveLeft(1), Clear(ClearType::UntilNewLine)));
        }
    }
}

impl<W: Write> RenderSink for TerminalSink<W> {
    fn show_thinking(&mut self, status: ThinkingStatus) {
        if self.interactive {
            self.thinking_visible = true;
            self.write_with(|out| {
                queue!(
                    out,
                    Print("\r"),
                    Clear(ClearType::CurrentLine),
                    PrintStyledContent(status.label().dark_grey().italic())
                )
            });
        }
    }

    fn clear_thinking(&mut self) {
        if self.thinking_visible {
            self.thinking_visible = false;
            self.write_with(|out| queue!(out, Print("\r"), Clear(ClearType::CurrentLine)));
        }
    }

    fn open_text(&mut self) {
        self.write_with(|out| queue!(out, PrintStyledContent("assistant> ".bold())));
    }

    fn append_text(&mut self, delta: &str, _rendered: &str) {
        self.erase_marker();
        let interactive = self.interactive;
        self.write_with(|out| {
            queue!(out, Print(delta))?;
            if interactive {
                queue!(out, PrintStyledContent(IN_PROGRESS_MARKER.dark_grey()))?;
            }
            Ok(())
        });
        self.marker_visible = interactive;
    }

    fn finalize_text(&mut self, _text: &str) {
        self.erase_marker();
        self.write_with(|out| queue!(out, Print("\n")));
    }

    fn create_tool(&mut self, record: &ToolInvocationRecord, input: &Map<String, Value>) {
        self.erase_marker();
        let line = format!("  ⚙ {}", record.display_name);
        let input_line = (!input.is_empty())
            .then(|| preview(&Value::Object(input.clone()).to_string(), INPUT_PREVIEW_CHARS));
        self.write_with(|out| {
            queue!(out, Print("\n"), PrintStyledContent(line.cyan()), Print("\n"))?;
            if let Some(input_line) = input_line {
                queue!(
                    out,
                    PrintStyledContent(format!("    {input_line}").dark_grey()),
                    Print("\n")
                )?;
            }
            Ok(())
        });
    }

    fn complete_tool(&mut self, record: &ToolInvocationRecord) {
        let line = format!("  ✓ {}", record.display_name);
        self.write_with(|out| queue!(out, PrintStyledContent(line.green()), Print("\n")));
    }

    fn show_metadata(&mut self, metadata: &Metadata) {
        let usage = metadata.usage;
        let line = format!(
            "tokens: {} in / {} out / {} total · latency: {} ms",
            usage.input_tokens, usage.output_tokens, usage.total_tokens, metadata.metrics.latency_ms
        );
        self.write_with(|out| queue!(out, PrintStyledContent(line.dark_grey()), Print("\n")));
    }

    fn show_error(&mut self, message: &str) {
        self.erase_marker();
        let message = message.to_string();
        self.write_with(|out| {
            queue!(out, Print("\n"), PrintStyledContent(message.red()), Print("\n"))
        });
    }

    fn show_raw(&mut self, lines: &[String]) {
        self.write_with(|out| {
            queue!(out, PrintStyledContent("raw events:".yellow()), Print("\n"))?;
            for line in lines {
                queue!(out, Print(format!("  {line}\n")))?;
            }
            Ok(())
        });
    }

    fn show_debug(&mut self, entries: &[DebugEntry]) {
        self.write_with(|out| {
            queue!(out, PrintStyledContent("debug:".magenta()), Print("\n"))?;
            for entry in entries {
                let payload = serde_json::to_string_pretty(&entry.payload)
                    .unwrap_or_else(|_| entry.payload.to_string());
                queue!(
                    out,
                    PrintStyledContent(format!("  {}", entry.label).bold()),
                    Print("\n"),
                    Print(format!("{payload}\n"))
                )?;
            }
            Ok(())
        });
    }
}
