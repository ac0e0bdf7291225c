//! Shared fixtures; not every test binary uses every helper
#![allow(dead_code)]

pub mod config;
pub mod mock_provider;

use futures_util::StreamExt;
use switchboard_llm::{EventStream, StreamEvent};

/// Collect every event until the stream ends
pub async fn drain(mut events: EventStream) -> Vec<StreamEvent> {
    let mut out = Vec::new();
    while let Some(event) = events.next().await {
        out.push(event);
    }
    out
}

/// Concatenated text deltas
pub fn text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::TextDelta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Compact event labels for order assertions
pub fn labels(events: &[StreamEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| match event {
            StreamEvent::TextDelta(t) => format!("text({t})"),
            StreamEvent::ReasoningDelta(t) => format!("reasoning({t})"),
            StreamEvent::ReasoningComplete(t) => format!("reasoning_complete({t})"),
            StreamEvent::ToolCall(call) => format!("tool_call({}:{:?})", call.id, call.status),
            StreamEvent::ToolResult(call) => format!("tool_result({}:{:?})", call.id, call.status),
            StreamEvent::ApprovalRequest(request) => format!("approval({})", request.id),
            StreamEvent::Usage(usage) => format!("usage({})", usage.total_tokens),
            StreamEvent::Error(error) => format!("error({})", error.code),
            StreamEvent::Done => "done".to_owned(),
        })
        .collect()
}
