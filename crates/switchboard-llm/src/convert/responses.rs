//! Responses body building and stream decoding
//!
//! Fresh turns and continuations differ only in the body; both feed the
//! same decoder.

use std::collections::{BTreeMap, HashSet};

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{base_body, system_text};
use crate::classify;
use crate::protocol::responses::{
    ApprovalResponse, InputContent, InputMessage, McpTool, OutputContent, OutputItem, ReasoningConfig,
    ResponsesFrame,
};
use crate::provider::sse::FrameDecoder;
use crate::registry::ToolServer;
use crate::tracking::{ToolCallTracker, ToolCallUpdate};
use crate::types::{
    ApprovalRequest, ContentPart, Message, Request, Role, StreamEvent, ToolCallStatus, Turn, Usage,
};

/// Build the request body for a fresh turn or a continuation
///
/// Tool servers are attached either way; the provider does not remember
/// them across a continuation.
pub fn build_body(request: &Request, messages: &[Message], servers: &[ToolServer]) -> Value {
    let mut body = base_body(&request.model, &request.params, &request.body);

    if let Some(max_tokens) = body.remove("max_tokens") {
        body.insert("max_output_tokens".to_owned(), max_tokens);
    }
    if request.params.frequency_penalty.is_some() || request.params.presence_penalty.is_some() {
        tracing::debug!(model = %request.model, "penalties are not supported by the responses adapter");
        body.remove("frequency_penalty");
        body.remove("presence_penalty");
    }

    if let Some(effort) = request.params.reasoning_effort {
        body.insert(
            "reasoning".to_owned(),
            json!(ReasoningConfig {
                effort: effort.as_str(),
                summary: "auto",
            }),
        );
    }

    match &request.turn {
        Turn::Fresh { .. } => {
            if let Some(instructions) = system_text(request.system_prompt.as_deref(), messages) {
                body.insert("instructions".to_owned(), json!(instructions));
            }
            let input: Vec<_> = messages.iter().filter_map(to_input).collect();
            body.insert("input".to_owned(), json!(input));
        }
        Turn::Continuation {
            previous_response_id,
            decisions,
        } => {
            body.insert("previous_response_id".to_owned(), json!(previous_response_id));
            let input: Vec<_> = decisions
                .iter()
                .map(|d| ApprovalResponse {
                    kind: "mcp_approval_response",
                    approve: d.approve,
                    approval_request_id: d.approval_request_id.clone(),
                    reason: d.reason.clone(),
                })
                .collect();
            body.insert("input".to_owned(), json!(input));
        }
    }

    if !servers.is_empty() {
        let tools: Vec<_> = servers.iter().map(to_mcp_tool).collect();
        body.insert("tools".to_owned(), json!(tools));
    }

    body.insert("stream".to_owned(), json!(true));

    Value::Object(body)
}

fn to_input(message: &Message) -> Option<InputMessage> {
    let role = match message.role {
        Role::System => return None,
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    let content = message
        .content
        .parts()
        .into_iter()
        .map(|part| match (&part, message.role) {
            (ContentPart::Text { text }, Role::Assistant) => InputContent::OutputText { text: text.clone() },
            (ContentPart::Text { text }, _) => InputContent::InputText { text: text.clone() },
            (ContentPart::Image { .. }, _) => InputContent::InputImage {
                image_url: part.data_uri().unwrap_or_default(),
            },
        })
        .collect();

    Some(InputMessage { role, content })
}

fn to_mcp_tool(server: &ToolServer) -> McpTool {
    let mut headers = server.headers.clone();
    if let Some(token) = &server.auth_token {
        headers.insert("Authorization".to_owned(), format!("Bearer {}", token.expose_secret()));
    }

    McpTool {
        kind: "mcp",
        server_label: server.label.clone(),
        server_url: server.url.clone(),
        require_approval: server.require_approval.as_str(),
        allowed_tools: server.allowed_tools.clone(),
        headers,
    }
}

/// What a wire `type` string means to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Created,
    TextDelta,
    ReasoningDelta,
    ReasoningDone,
    ToolInProgress,
    ToolCompleted,
    ToolFailed,
    ItemAdded,
    ItemDone,
    Completed,
    Incomplete,
    Failed,
    Error,
    Ignored,
}

/// Wire type to frame kind; entries starting with `.` match as suffixes
const FRAME_KINDS: &[(&str, FrameKind)] = &[
    ("response.created", FrameKind::Created),
    ("response.completed", FrameKind::Completed),
    ("response.incomplete", FrameKind::Incomplete),
    ("response.failed", FrameKind::Failed),
    ("error", FrameKind::Error),
    (".output_text.delta", FrameKind::TextDelta),
    (".reasoning_summary_text.delta", FrameKind::ReasoningDelta),
    (".reasoning_summary_text.done", FrameKind::ReasoningDone),
    (".mcp_call.in_progress", FrameKind::ToolInProgress),
    (".mcp_call.completed", FrameKind::ToolCompleted),
    (".mcp_call.failed", FrameKind::ToolFailed),
    (".output_item.added", FrameKind::ItemAdded),
    (".output_item.done", FrameKind::ItemDone),
];

impl FrameKind {
    pub fn from_wire(kind: &str) -> Self {
        FRAME_KINDS
            .iter()
            .find(|(pattern, _)| {
                if pattern.starts_with('.') {
                    kind.ends_with(pattern)
                } else {
                    kind == *pattern
                }
            })
            .map_or(Self::Ignored, |(_, frame_kind)| *frame_kind)
    }
}

/// Decoder for event-typed frames
pub struct ResponsesDecoder {
    provider: String,
    response_id: Option<String>,
    /// Reasoning summary text per summary index
    reasoning: BTreeMap<u32, String>,
    tools: ToolCallTracker,
    /// Message items whose text arrived as deltas
    streamed_items: HashSet<String>,
    /// Any delta text forwarded, keyed or not
    streamed_text: bool,
    /// Message items, or bare texts, already surfaced from a legacy output array
    legacy_seen: HashSet<String>,
}

impl ResponsesDecoder {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            response_id: None,
            reasoning: BTreeMap::new(),
            tools: ToolCallTracker::new(),
            streamed_items: HashSet::new(),
            streamed_text: false,
            legacy_seen: HashSet::new(),
        }
    }

    fn on_frame(&mut self, kind: FrameKind, frame: &mut ResponsesFrame, raw: &Value) -> Vec<StreamEvent> {
        match kind {
            FrameKind::Created => {
                if let Some(id) = frame.response.as_ref().and_then(|r| r.id.clone()) {
                    tracing::debug!(response_id = %id, "response created");
                    self.response_id = Some(id);
                }
                Vec::new()
            }
            FrameKind::TextDelta => self.on_text_delta(frame),
            FrameKind::ReasoningDelta => {
                let Some(delta) = frame.delta.take().filter(|d| !d.is_empty()) else {
                    return Vec::new();
                };
                self.reasoning
                    .entry(frame.summary_index.unwrap_or(0))
                    .or_default()
                    .push_str(&delta);
                vec![StreamEvent::ReasoningDelta(delta)]
            }
            FrameKind::ReasoningDone => {
                let index = frame.summary_index.unwrap_or(0);
                if let Some(text) = frame.text.take() {
                    self.reasoning.insert(index, text);
                }
                let aggregate = self
                    .reasoning
                    .values()
                    .filter(|part| !part.is_empty())
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("\n\n");
                vec![StreamEvent::ReasoningComplete(aggregate)]
            }
            FrameKind::ToolInProgress => self.on_tool_status(frame, ToolCallStatus::Pending),
            FrameKind::ToolCompleted => self.on_tool_status(frame, ToolCallStatus::Completed),
            FrameKind::ToolFailed => self.on_tool_status(frame, ToolCallStatus::Failed),
            FrameKind::ItemAdded | FrameKind::ItemDone => frame
                .item
                .take()
                .map(|item| self.on_item(item))
                .unwrap_or_default(),
            FrameKind::Completed => {
                let mut events = Vec::with_capacity(2);
                if let Some(usage) = frame.response.as_ref().and_then(|r| r.usage) {
                    events.push(StreamEvent::Usage(Usage {
                        input_tokens: usage.input_tokens,
                        output_tokens: usage.output_tokens,
                        total_tokens: usage.total_tokens,
                    }));
                }
                events.push(StreamEvent::Done);
                events
            }
            FrameKind::Incomplete => {
                let reason = frame.response.as_ref().and_then(|r| r.incomplete_details.as_ref());
                tracing::warn!(provider = %self.provider, reason = ?reason, "response incomplete");
                vec![StreamEvent::Done]
            }
            FrameKind::Failed => {
                let error = frame
                    .response
                    .as_ref()
                    .and_then(|r| r.error.clone())
                    .map_or_else(|| raw.clone(), |error| json!({ "error": error }));
                vec![StreamEvent::Error(classify::stream_failure(
                    &self.provider,
                    classify::responses,
                    &error,
                ))]
            }
            FrameKind::Error => vec![StreamEvent::Error(classify::stream_failure(
                &self.provider,
                classify::responses,
                raw,
            ))],
            FrameKind::Ignored => Vec::new(),
        }
    }

    fn on_text_delta(&mut self, frame: &mut ResponsesFrame) -> Vec<StreamEvent> {
        let Some(delta) = frame.delta.take().filter(|d| !d.is_empty()) else {
            return Vec::new();
        };

        if let Some(item_id) = &frame.item_id {
            if self.legacy_seen.contains(item_id) {
                tracing::debug!(item_id = %item_id, "dropping delta already surfaced from legacy output");
                return Vec::new();
            }
            self.streamed_items.insert(item_id.clone());
        }

        self.streamed_text = true;
        vec![StreamEvent::TextDelta(delta)]
    }

    fn on_tool_status(&mut self, frame: &ResponsesFrame, status: ToolCallStatus) -> Vec<StreamEvent> {
        let Some(id) = &frame.item_id else {
            return Vec::new();
        };

        let mut update = ToolCallUpdate::new(id.clone(), status);
        if status == ToolCallStatus::Failed {
            update.error = frame
                .error
                .as_ref()
                .map(error_text)
                .or_else(|| frame.message.clone())
                .or_else(|| Some("tool call failed".to_owned()));
        }

        self.tools.apply(update).into_iter().collect()
    }

    fn on_item(&mut self, item: OutputItem) -> Vec<StreamEvent> {
        match item {
            OutputItem::McpCall {
                id,
                name,
                arguments,
                server_label,
                output,
                error,
            } => {
                let error = error.filter(|e| !e.is_null()).map(|e| error_text(&e));
                let status = if error.is_some() {
                    ToolCallStatus::Failed
                } else if output.is_some() {
                    ToolCallStatus::Completed
                } else {
                    ToolCallStatus::Executing
                };

                let mut update = ToolCallUpdate::new(id, status);
                update.name = Some(name);
                update.arguments = Some(arguments);
                update.server_label = server_label;
                update.result = output;
                update.error = error;

                self.tools.apply(update).into_iter().collect()
            }
            OutputItem::McpApprovalRequest {
                id,
                name,
                arguments,
                server_label,
            } => {
                if !self.tools.first_approval(&id) {
                    return Vec::new();
                }
                let response_id = self.response_id.clone().unwrap_or_else(|| {
                    tracing::warn!(approval = %id, "approval request before response id was known");
                    String::new()
                });
                vec![StreamEvent::ApprovalRequest(ApprovalRequest {
                    id,
                    tool_name: name,
                    arguments,
                    server_label,
                    response_id,
                })]
            }
            OutputItem::Message { .. } | OutputItem::Other => Vec::new(),
        }
    }

    /// Text from a legacy output array not already delivered as deltas
    fn legacy_text(&mut self, output: Vec<OutputItem>) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        for item in output {
            let OutputItem::Message { id, content } = item else {
                continue;
            };
            let text: String = content
                .into_iter()
                .filter_map(|c| match c {
                    OutputContent::OutputText { text } => Some(text),
                    OutputContent::Other => None,
                })
                .collect();
            if text.is_empty() {
                continue;
            }

            // without an id there is no telling which deltas carried it
            let key = match id {
                Some(id) => id,
                None if self.streamed_text => continue,
                None => text.clone(),
            };
            if self.streamed_items.contains(&key) || !self.legacy_seen.insert(key) {
                continue;
            }
            events.push(StreamEvent::TextDelta(text));
        }

        events
    }
}

impl FrameDecoder for ResponsesDecoder {
    fn decode(&mut self, data: &str) -> Vec<StreamEvent> {
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Vec::new();
        }

        let raw: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE frame");
                return Vec::new();
            }
        };
        let mut frame = match ResponsesFrame::deserialize(&raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, "skipping frame with unexpected shape");
                return Vec::new();
            }
        };

        let kind = FrameKind::from_wire(&frame.kind);
        let legacy = frame
            .output
            .take()
            .or_else(|| frame.response.as_mut().and_then(|r| r.output.take()));

        let mut events = self.on_frame(kind, &mut frame, &raw);

        if let Some(output) = legacy {
            let extra = self.legacy_text(output);
            let at = events.iter().position(StreamEvent::is_terminal).unwrap_or(events.len());
            events.splice(at..at, extra);
        }

        events
    }
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(text) => text.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use secrecy::SecretString;
    use switchboard_config::ApprovalMode;

    use super::*;
    use crate::error::ErrorCode;
    use crate::types::{ApprovalDecision, GenerationParams, ReasoningEffort, ToolCall};

    fn decode(decoder: &mut ResponsesDecoder, frames: &[Value]) -> Vec<StreamEvent> {
        frames.iter().flat_map(|f| decoder.decode(&f.to_string())).collect()
    }

    fn server() -> ToolServer {
        ToolServer {
            label: "github".into(),
            url: "https://tools.example.com/mcp".into(),
            require_approval: ApprovalMode::Always,
            allowed_tools: Some(vec!["search".into()]),
            auth_token: Some(SecretString::from("tok".to_owned())),
            headers: IndexMap::new(),
        }
    }

    #[test]
    fn frame_kind_table() {
        assert_eq!(FrameKind::from_wire("response.output_text.delta"), FrameKind::TextDelta);
        assert_eq!(
            FrameKind::from_wire("response.reasoning_summary_text.done"),
            FrameKind::ReasoningDone
        );
        assert_eq!(FrameKind::from_wire("response.mcp_call.in_progress"), FrameKind::ToolInProgress);
        assert_eq!(FrameKind::from_wire("response.created"), FrameKind::Created);
        assert_eq!(FrameKind::from_wire("error"), FrameKind::Error);
        assert_eq!(FrameKind::from_wire("response.mcp_list_tools.completed"), FrameKind::Ignored);
        assert_eq!(FrameKind::from_wire("response.output_text.done"), FrameKind::Ignored);
        assert_eq!(FrameKind::from_wire("totally.new"), FrameKind::Ignored);
    }

    #[test]
    fn text_and_usage() {
        let mut decoder = ResponsesDecoder::new("openai");
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "response.created", "response": {"id": "resp_1"}}),
                json!({"type": "response.output_text.delta", "item_id": "msg_1", "delta": "Hel"}),
                json!({"type": "response.output_text.delta", "item_id": "msg_1", "delta": "lo"}),
                json!({"type": "response.completed", "response": {"id": "resp_1", "usage": {"input_tokens": 3, "output_tokens": 2, "total_tokens": 5}}}),
            ],
        );

        assert!(matches!(&events[0], StreamEvent::TextDelta(t) if t == "Hel"));
        assert!(matches!(&events[1], StreamEvent::TextDelta(t) if t == "lo"));
        assert!(matches!(events[2], StreamEvent::Usage(Usage { total_tokens: 5, .. })));
        assert!(matches!(events[3], StreamEvent::Done));
    }

    #[test]
    fn reasoning_parts_join_in_index_order() {
        let mut decoder = ResponsesDecoder::new("openai");
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "response.reasoning_summary_text.delta", "summary_index": 1, "delta": "second"}),
                json!({"type": "response.reasoning_summary_text.delta", "summary_index": 0, "delta": "fir"}),
                json!({"type": "response.reasoning_summary_text.delta", "summary_index": 0, "delta": "st"}),
                json!({"type": "response.reasoning_summary_text.done", "summary_index": 0, "text": "first"}),
            ],
        );

        let deltas: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ReasoningDelta(d) => Some(d.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, ["second", "fir", "st"]);

        let Some(StreamEvent::ReasoningComplete(aggregate)) = events.last() else {
            panic!("expected reasoning complete");
        };
        assert_eq!(aggregate, "first\n\nsecond");
    }

    fn tool_states(events: &[StreamEvent]) -> Vec<(&'static str, ToolCallStatus)> {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ToolCall(ToolCall { status, .. }) => Some(("call", *status)),
                StreamEvent::ToolResult(ToolCall { status, .. }) => Some(("result", *status)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn tool_lifecycle_collapses() {
        let mut decoder = ResponsesDecoder::new("openai");
        let item = json!({"type": "mcp_call", "id": "mcp_1", "name": "search", "arguments": "{\"q\":\"x\"}", "server_label": "github"});
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "response.mcp_call.in_progress", "item_id": "mcp_1"}),
                json!({"type": "response.output_item.added", "item": item}),
                json!({"type": "response.output_item.added", "item": item}),
                json!({"type": "response.mcp_call.completed", "item_id": "mcp_1"}),
                json!({"type": "response.output_item.done", "item": {"type": "mcp_call", "id": "mcp_1", "name": "search", "output": "3 hits"}}),
                json!({"type": "response.mcp_call.in_progress", "item_id": "mcp_1"}),
            ],
        );

        assert_eq!(
            tool_states(&events),
            [
                ("call", ToolCallStatus::Pending),
                ("call", ToolCallStatus::Executing),
                ("result", ToolCallStatus::Completed),
                ("result", ToolCallStatus::Completed),
            ]
        );

        let StreamEvent::ToolResult(last) = &events[3] else {
            panic!("expected tool result");
        };
        assert_eq!(last.result.as_deref(), Some("3 hits"));
        assert_eq!(last.server_label.as_deref(), Some("github"));
    }

    #[test]
    fn failed_tool_call_carries_error() {
        let mut decoder = ResponsesDecoder::new("openai");
        let events = decode(
            &mut decoder,
            &[json!({"type": "response.output_item.done", "item": {"type": "mcp_call", "id": "mcp_2", "name": "fetch", "error": {"message": "server unreachable"}}})],
        );

        let [StreamEvent::ToolCall(call)] = events.as_slice() else {
            panic!("expected one tool call, got {events:?}");
        };
        assert_eq!(call.status, ToolCallStatus::Failed);
        assert_eq!(call.error.as_deref(), Some("server unreachable"));
    }

    #[test]
    fn approval_request_carries_response_id_once() {
        let mut decoder = ResponsesDecoder::new("openai");
        let approval = json!({"type": "mcp_approval_request", "id": "req_9", "name": "delete_repo", "arguments": "{}", "server_label": "github"});
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "response.created", "response": {"id": "resp_1"}}),
                json!({"type": "response.output_item.added", "item": approval}),
                json!({"type": "response.output_item.done", "item": approval}),
                json!({"type": "response.completed", "response": {"id": "resp_1"}}),
            ],
        );

        let approvals: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::ApprovalRequest(a) => Some(a),
                _ => None,
            })
            .collect();
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].id, "req_9");
        assert_eq!(approvals[0].response_id, "resp_1");
        assert_eq!(approvals[0].tool_name, "delete_repo");
    }

    #[test]
    fn stream_errors_are_events() {
        let mut decoder = ResponsesDecoder::new("openai");
        let events = decoder.decode(&json!({"type": "error", "code": "rate_limit_exceeded", "message": "Slow down"}).to_string());
        let [StreamEvent::Error(error)] = events.as_slice() else {
            panic!("expected error");
        };
        assert_eq!(error.code, ErrorCode::RateLimit);
        assert_eq!(error.message, "Slow down");

        let events = decoder.decode(
            &json!({"type": "response.failed", "response": {"id": "r", "status": "failed", "error": {"code": "server_error", "message": "The model crashed"}}}).to_string(),
        );
        let [StreamEvent::Error(error)] = events.as_slice() else {
            panic!("expected error");
        };
        assert_eq!(error.code, ErrorCode::ServerError);
        assert_eq!(error.message, "The model crashed");
    }

    #[test]
    fn legacy_output_is_deduplicated() {
        let mut decoder = ResponsesDecoder::new("openai");
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "response.output_text.delta", "item_id": "msg_1", "delta": "Hi"}),
                json!({"type": "response.completed", "response": {"id": "r", "output": [
                    {"type": "message", "id": "msg_1", "content": [{"type": "output_text", "text": "Hi"}]},
                    {"type": "message", "id": "msg_2", "content": [{"type": "output_text", "text": "Also this"}]}
                ]}}),
            ],
        );

        let texts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, ["Hi", "Also this"]);
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[test]
    fn legacy_only_frames_surface_text_once() {
        let mut decoder = ResponsesDecoder::new("openai");
        let legacy = json!({"type": "response.in_progress", "output": [{"type": "message", "content": [{"type": "output_text", "text": "whole"}]}]});
        let events = decode(&mut decoder, &[legacy.clone(), legacy]);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::TextDelta(t) if t == "whole"));
    }

    #[test]
    fn legacy_item_without_id_is_dropped_after_deltas() {
        let mut decoder = ResponsesDecoder::new("openai");
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "response.output_text.delta", "item_id": "msg_1", "delta": "Hi"}),
                json!({"type": "response.completed", "response": {"id": "r", "output": [
                    {"type": "message", "content": [{"type": "output_text", "text": "Hi"}]}
                ]}}),
            ],
        );

        let texts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, ["Hi"]);
    }

    #[test]
    fn fresh_body() {
        let messages = vec![Message::system("be brief"), Message::user("hi"), Message::assistant("hello")];
        let request = Request::new("gpt-5", messages.clone()).with_params(GenerationParams {
            max_tokens: Some(100),
            reasoning_effort: Some(ReasoningEffort::High),
            ..GenerationParams::default()
        });

        let body = build_body(&request, &messages, &[]);

        assert_eq!(
            body,
            json!({
                "model": "gpt-5",
                "max_output_tokens": 100,
                "reasoning": {"effort": "high", "summary": "auto"},
                "instructions": "be brief",
                "input": [
                    {"role": "user", "content": [{"type": "input_text", "text": "hi"}]},
                    {"role": "assistant", "content": [{"type": "output_text", "text": "hello"}]}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn continuation_body_reattaches_servers() {
        let request = Request::continuation(
            "gpt-5",
            "resp_1",
            vec![ApprovalDecision {
                approval_request_id: "req_9".into(),
                approve: true,
                reason: None,
            }],
        );

        let body = build_body(&request, &[], &[server()]);

        assert_eq!(
            body,
            json!({
                "model": "gpt-5",
                "previous_response_id": "resp_1",
                "input": [{"type": "mcp_approval_response", "approve": true, "approval_request_id": "req_9"}],
                "tools": [{
                    "type": "mcp",
                    "server_label": "github",
                    "server_url": "https://tools.example.com/mcp",
                    "require_approval": "always",
                    "allowed_tools": ["search"],
                    "headers": {"Authorization": "Bearer tok"}
                }],
                "stream": true
            })
        );
    }
}
