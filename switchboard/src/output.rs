//! Terminal rendering of stream events

use std::io::Write;

use switchboard_llm::{StreamEvent, ToolCall, ToolCallStatus};

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Writes model text to `out` and everything else to `err`
pub struct Printer<O, E> {
    out: O,
    err: E,
    /// Whether the last byte on `out` was model text without a newline
    mid_line: bool,
    failed: bool,
}

impl<O: Write, E: Write> Printer<O, E> {
    pub const fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            mid_line: false,
            failed: false,
        }
    }

    /// Whether an error event was printed
    pub const fn failed(&self) -> bool {
        self.failed
    }

    pub fn print(&mut self, event: &StreamEvent) -> std::io::Result<()> {
        match event {
            StreamEvent::TextDelta(text) => {
                self.out.write_all(text.as_bytes())?;
                self.out.flush()?;
                self.mid_line = !text.ends_with('\n');
            }
            StreamEvent::ReasoningDelta(text) => {
                write!(self.err, "{DIM}{text}{RESET}")?;
            }
            StreamEvent::ReasoningComplete(_) => writeln!(self.err)?,
            StreamEvent::ToolCall(call) => {
                self.end_line()?;
                writeln!(self.err, "{DIM}[tool] {}{RESET}", describe(call))?;
            }
            StreamEvent::ToolResult(call) => {
                self.end_line()?;
                let outcome = match call.status {
                    ToolCallStatus::Failed => call.error.as_deref().unwrap_or("failed"),
                    _ => call.result.as_deref().unwrap_or(""),
                };
                writeln!(self.err, "{DIM}[tool] {} -> {outcome}{RESET}", describe(call))?;
            }
            StreamEvent::ApprovalRequest(request) => {
                self.end_line()?;
                writeln!(
                    self.err,
                    "approval needed for {} on {} with {}",
                    request.tool_name,
                    request.server_label.as_deref().unwrap_or("unknown server"),
                    request.arguments,
                )?;
                writeln!(
                    self.err,
                    "  resume with: --resume {} --approve {} (or --deny {})",
                    request.response_id, request.id, request.id
                )?;
            }
            StreamEvent::Usage(usage) => {
                tracing::debug!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    total_tokens = usage.total_tokens,
                    "usage"
                );
            }
            StreamEvent::Error(error) => {
                self.end_line()?;
                self.failed = true;
                writeln!(self.err, "{}", error.render())?;
            }
            StreamEvent::Done => self.end_line()?,
        }

        Ok(())
    }

    fn end_line(&mut self) -> std::io::Result<()> {
        if self.mid_line {
            writeln!(self.out)?;
            self.mid_line = false;
        }
        self.out.flush()
    }
}

fn describe(call: &ToolCall) -> String {
    match &call.server_label {
        Some(server) => format!("{server}/{} ({:?})", call.name, call.status),
        None => format!("{} ({:?})", call.name, call.status),
    }
}
