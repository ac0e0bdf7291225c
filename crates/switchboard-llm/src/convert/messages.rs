//! Messages body building and block-stream decoding

use std::collections::HashMap;

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{base_body, system_text};
use crate::classify;
use crate::protocol::messages::{
    ImageSource, McpServer, MessagesContent, MessagesContentBlock, MessagesMessage, MessagesStreamEvent,
    StreamContentBlock, StreamDelta, ToolConfiguration,
};
use crate::provider::sse::FrameDecoder;
use crate::registry::ToolServer;
use crate::tracking::{ToolCallTracker, ToolCallUpdate};
use crate::types::{Content, ContentPart, Message, Request, Role, StreamEvent, ToolCallStatus, Usage};

/// Used when the caller sets no limit; the protocol requires one
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Build the streaming request body
pub fn build_body(request: &Request, messages: &[Message], servers: &[ToolServer]) -> Value {
    let mut body = base_body(&request.model, &request.params, &request.body);

    body.remove("frequency_penalty");
    body.remove("presence_penalty");
    body.entry("max_tokens").or_insert_with(|| json!(DEFAULT_MAX_TOKENS));

    if let Some(system) = system_text(request.system_prompt.as_deref(), messages) {
        body.insert("system".to_owned(), json!(system));
    }

    let wire: Vec<_> = messages.iter().filter_map(to_wire).collect();
    body.insert("messages".to_owned(), json!(wire));

    if !servers.is_empty() {
        let servers: Vec<_> = servers.iter().map(to_mcp_server).collect();
        body.insert("mcp_servers".to_owned(), json!(servers));
    }

    body.insert("stream".to_owned(), json!(true));

    Value::Object(body)
}

fn to_wire(message: &Message) -> Option<MessagesMessage> {
    let role = match message.role {
        Role::System => return None,
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    let content = match &message.content {
        Content::Text(text) => MessagesContent::Text(text.clone()),
        Content::Parts(parts) => MessagesContent::Blocks(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => MessagesContentBlock::Text { text: text.clone() },
                    ContentPart::Image { mime_type, data } => MessagesContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: mime_type.clone(),
                            data: data.clone(),
                        },
                    },
                })
                .collect(),
        ),
    };

    Some(MessagesMessage { role, content })
}

fn to_mcp_server(server: &ToolServer) -> McpServer {
    McpServer {
        kind: "url",
        url: server.url.clone(),
        name: server.label.clone(),
        authorization_token: server.auth_token.as_ref().map(|t| t.expose_secret().to_owned()),
        tool_configuration: server.allowed_tools.as_ref().map(|tools| ToolConfiguration {
            enabled: true,
            allowed_tools: tools.clone(),
        }),
    }
}

/// A content block that is still open
enum OpenBlock {
    Text,
    Thinking(String),
    /// Tool invocation collecting `input_json_delta` fragments
    ToolUse {
        id: String,
        json: String,
    },
}

/// Decoder for content-block frames
pub struct MessagesDecoder {
    provider: String,
    tools: ToolCallTracker,
    blocks: HashMap<u32, OpenBlock>,
    /// No text delta seen since the last block start
    first_delta_in_block: bool,
    emitted_text: bool,
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

impl MessagesDecoder {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            tools: ToolCallTracker::new(),
            blocks: HashMap::new(),
            first_delta_in_block: true,
            emitted_text: false,
            input_tokens: None,
            output_tokens: None,
        }
    }

    fn on_block_start(&mut self, index: u32, block: StreamContentBlock) -> Vec<StreamEvent> {
        self.first_delta_in_block = true;

        match block {
            StreamContentBlock::Text { text } => {
                self.blocks.insert(index, OpenBlock::Text);
                self.text(text).into_iter().collect()
            }
            StreamContentBlock::Thinking { thinking } => {
                self.blocks.insert(index, OpenBlock::Thinking(thinking));
                Vec::new()
            }
            StreamContentBlock::ToolUse { id, name, input } | StreamContentBlock::ServerToolUse { id, name, input } => {
                self.on_tool_use(index, id, name, None, &input)
            }
            StreamContentBlock::McpToolUse {
                id,
                name,
                server_name,
                input,
            } => self.on_tool_use(index, id, name, server_name, &input),
            StreamContentBlock::McpToolResult {
                tool_use_id,
                is_error,
                content,
            }
            | StreamContentBlock::ToolResult {
                tool_use_id,
                is_error,
                content,
            } => self.on_tool_result(&tool_use_id, is_error, &content),
            StreamContentBlock::WebSearchToolResult { tool_use_id, content } => {
                let is_error = content.get("type").and_then(Value::as_str) == Some("web_search_tool_result_error");
                self.on_tool_result(&tool_use_id, is_error, &content)
            }
            StreamContentBlock::Other => Vec::new(),
        }
    }

    fn on_tool_use(
        &mut self,
        index: u32,
        id: String,
        name: String,
        server_label: Option<String>,
        input: &Value,
    ) -> Vec<StreamEvent> {
        self.blocks.insert(
            index,
            OpenBlock::ToolUse {
                id: id.clone(),
                json: String::new(),
            },
        );

        let mut update = ToolCallUpdate::new(id, ToolCallStatus::Executing);
        update.name = Some(name);
        update.arguments = match input {
            Value::Object(map) if map.is_empty() => None,
            Value::Null => None,
            other => Some(other.to_string()),
        };
        update.server_label = server_label;

        self.tools.apply(update).into_iter().collect()
    }

    fn on_tool_result(&mut self, tool_use_id: &str, is_error: bool, content: &Value) -> Vec<StreamEvent> {
        if !self.tools.contains(tool_use_id) {
            tracing::debug!(tool_use_id, "tool result without a matching tool use");
            return Vec::new();
        }

        let text = result_text(content);
        let mut update = ToolCallUpdate::new(
            tool_use_id,
            if is_error {
                ToolCallStatus::Failed
            } else {
                ToolCallStatus::Completed
            },
        );
        if is_error {
            update.error = Some(text);
        } else {
            update.result = Some(text);
        }

        self.tools.apply(update).into_iter().collect()
    }

    fn on_block_stop(&mut self, index: u32) -> Vec<StreamEvent> {
        match self.blocks.remove(&index) {
            Some(OpenBlock::ToolUse { id, json }) if !json.is_empty() => {
                let mut update = ToolCallUpdate::new(id, ToolCallStatus::Executing);
                update.arguments = Some(json);
                self.tools.apply(update).into_iter().collect()
            }
            Some(OpenBlock::Thinking(text)) if !text.is_empty() => vec![StreamEvent::ReasoningComplete(text)],
            _ => Vec::new(),
        }
    }

    /// Text delta, separated from an earlier block by a blank line
    fn text(&mut self, text: String) -> Option<StreamEvent> {
        if text.is_empty() {
            return None;
        }

        let text = if self.first_delta_in_block && self.emitted_text {
            format!("\n\n{text}")
        } else {
            text
        };
        self.first_delta_in_block = false;
        self.emitted_text = true;

        Some(StreamEvent::TextDelta(text))
    }

    fn complete(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(2);
        if self.input_tokens.is_some() || self.output_tokens.is_some() {
            events.push(StreamEvent::Usage(Usage::new(
                self.input_tokens.take().unwrap_or(0),
                self.output_tokens.take().unwrap_or(0),
            )));
        }
        events.push(StreamEvent::Done);
        events
    }
}

impl FrameDecoder for MessagesDecoder {
    fn decode(&mut self, data: &str) -> Vec<StreamEvent> {
        let data = data.trim();
        if data.is_empty() {
            return Vec::new();
        }

        let raw: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE frame");
                return Vec::new();
            }
        };
        let event = match MessagesStreamEvent::deserialize(&raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(error = %e, "skipping frame with unexpected shape");
                return Vec::new();
            }
        };

        match event {
            MessagesStreamEvent::MessageStart { message } => {
                if let Some(usage) = message.usage {
                    self.input_tokens = usage.input_tokens.or(self.input_tokens);
                    self.output_tokens = usage.output_tokens.or(self.output_tokens);
                }
                Vec::new()
            }
            MessagesStreamEvent::ContentBlockStart { index, content_block } => self.on_block_start(index, content_block),
            MessagesStreamEvent::ContentBlockDelta { index, delta } => match delta {
                StreamDelta::TextDelta { text } => self.text(text).into_iter().collect(),
                StreamDelta::InputJsonDelta { partial_json } => {
                    if let Some(OpenBlock::ToolUse { json, .. }) = self.blocks.get_mut(&index) {
                        json.push_str(&partial_json);
                    }
                    Vec::new()
                }
                StreamDelta::ThinkingDelta { thinking } => {
                    if thinking.is_empty() {
                        return Vec::new();
                    }
                    if let Some(OpenBlock::Thinking(text)) = self.blocks.get_mut(&index) {
                        text.push_str(&thinking);
                    }
                    vec![StreamEvent::ReasoningDelta(thinking)]
                }
                StreamDelta::Other => Vec::new(),
            },
            MessagesStreamEvent::ContentBlockStop { index } => self.on_block_stop(index),
            MessagesStreamEvent::MessageDelta { usage } => {
                if let Some(usage) = usage {
                    self.input_tokens = usage.input_tokens.or(self.input_tokens);
                    self.output_tokens = usage.output_tokens.or(self.output_tokens);
                }
                Vec::new()
            }
            MessagesStreamEvent::MessageStop => self.complete(),
            MessagesStreamEvent::Error { .. } => vec![StreamEvent::Error(classify::stream_failure(
                &self.provider,
                classify::messages,
                &raw,
            ))],
            MessagesStreamEvent::Ping | MessagesStreamEvent::Unknown => Vec::new(),
        }
    }
}

/// Flatten a tool result's content to text
fn result_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .map(|block| {
                block
                    .get("text")
                    .and_then(Value::as_str)
                    .map_or_else(|| block.to_string(), str::to_owned)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use switchboard_config::ApprovalMode;

    use super::*;
    use crate::error::ErrorCode;
    use crate::types::GenerationParams;

    fn decode(decoder: &mut MessagesDecoder, frames: &[Value]) -> Vec<StreamEvent> {
        frames.iter().flat_map(|f| decoder.decode(&f.to_string())).collect()
    }

    fn text_of(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn separates_consecutive_text_blocks() {
        let mut decoder = MessagesDecoder::new("anthropic");
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "message_start", "message": {"id": "msg_1", "usage": {"input_tokens": 10, "output_tokens": 1}}}),
                json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "First"}}),
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": " part."}}),
                json!({"type": "content_block_stop", "index": 0}),
                json!({"type": "ping"}),
                json!({"type": "content_block_start", "index": 1, "content_block": {"type": "text", "text": ""}}),
                json!({"type": "content_block_delta", "index": 1, "delta": {"type": "text_delta", "text": "Second."}}),
                json!({"type": "content_block_stop", "index": 1}),
                json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 7}}),
                json!({"type": "message_stop"}),
            ],
        );

        assert_eq!(text_of(&events), "First part.\n\nSecond.");
        assert!(matches!(
            events[events.len() - 2],
            StreamEvent::Usage(Usage {
                input_tokens: 10,
                output_tokens: 7,
                total_tokens: 17
            })
        ));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[test]
    fn tool_use_then_result() {
        let mut decoder = MessagesDecoder::new("anthropic");
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "content_block_start", "index": 0, "content_block": {"type": "mcp_tool_use", "id": "toolu_1", "name": "search", "server_name": "github", "input": {}}}),
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "input_json_delta", "partial_json": "{\"q\":"}}),
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "input_json_delta", "partial_json": "\"rust\"}"}}),
                json!({"type": "content_block_stop", "index": 0}),
                json!({"type": "content_block_start", "index": 1, "content_block": {"type": "mcp_tool_result", "tool_use_id": "toolu_1", "is_error": false, "content": [{"type": "text", "text": "3 hits"}]}}),
                json!({"type": "content_block_stop", "index": 1}),
            ],
        );

        let [
            StreamEvent::ToolCall(started),
            StreamEvent::ToolCall(with_args),
            StreamEvent::ToolResult(finished),
        ] = events.as_slice()
        else {
            panic!("unexpected events {events:?}");
        };

        assert_eq!(started.status, ToolCallStatus::Executing);
        assert_eq!(started.server_label.as_deref(), Some("github"));
        assert_eq!(started.arguments, "");
        assert_eq!(with_args.arguments, r#"{"q":"rust"}"#);
        assert_eq!(finished.status, ToolCallStatus::Completed);
        assert_eq!(finished.result.as_deref(), Some("3 hits"));
    }

    #[test]
    fn failed_tool_result() {
        let mut decoder = MessagesDecoder::new("anthropic");
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "content_block_start", "index": 0, "content_block": {"type": "tool_use", "id": "t1", "name": "fetch", "input": {"url": "x"}}}),
                json!({"type": "content_block_start", "index": 1, "content_block": {"type": "tool_result", "tool_use_id": "t1", "is_error": true, "content": "unreachable"}}),
                json!({"type": "content_block_start", "index": 2, "content_block": {"type": "tool_result", "tool_use_id": "unknown", "content": "x"}}),
            ],
        );

        assert_eq!(events.len(), 2);
        let StreamEvent::ToolCall(call) = &events[0] else {
            panic!("expected tool call");
        };
        assert_eq!(call.arguments, r#"{"url":"x"}"#);
        let StreamEvent::ToolResult(result) = &events[1] else {
            panic!("expected tool result");
        };
        assert_eq!(result.status, ToolCallStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("unreachable"));
    }

    #[test]
    fn thinking_blocks_become_reasoning() {
        let mut decoder = MessagesDecoder::new("anthropic");
        let events = decode(
            &mut decoder,
            &[
                json!({"type": "content_block_start", "index": 0, "content_block": {"type": "thinking", "thinking": ""}}),
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "thinking_delta", "thinking": "Let me see"}}),
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "signature_delta", "signature": "sig"}}),
                json!({"type": "content_block_stop", "index": 0}),
                json!({"type": "content_block_start", "index": 1, "content_block": {"type": "text", "text": ""}}),
                json!({"type": "content_block_delta", "index": 1, "delta": {"type": "text_delta", "text": "Answer"}}),
            ],
        );

        assert!(matches!(&events[0], StreamEvent::ReasoningDelta(t) if t == "Let me see"));
        assert!(matches!(&events[1], StreamEvent::ReasoningComplete(t) if t == "Let me see"));
        // no separator: nothing visible came before
        assert!(matches!(&events[2], StreamEvent::TextDelta(t) if t == "Answer"));
    }

    #[test]
    fn error_frame() {
        let mut decoder = MessagesDecoder::new("anthropic");
        let events = decoder.decode(
            &json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}).to_string(),
        );
        let [StreamEvent::Error(error)] = events.as_slice() else {
            panic!("expected error");
        };
        assert_eq!(error.code, ErrorCode::ServerError);
        assert_eq!(error.provider, "anthropic");
    }

    #[test]
    fn body_shape() {
        let messages = vec![Message::system("be brief"), Message::user("hi")];
        let request = Request::new("claude-sonnet-4-5", messages.clone()).with_params(GenerationParams {
            temperature: Some(0.5),
            presence_penalty: Some(1.0),
            ..GenerationParams::default()
        });
        let server = ToolServer {
            label: "github".into(),
            url: "https://tools.example.com/mcp".into(),
            require_approval: ApprovalMode::Never,
            allowed_tools: None,
            auth_token: None,
            headers: IndexMap::new(),
        };

        let body = build_body(&request, &messages, &[server]);

        assert_eq!(
            body,
            json!({
                "model": "claude-sonnet-4-5",
                "temperature": 0.5,
                "max_tokens": 4096,
                "system": "be brief",
                "messages": [{"role": "user", "content": "hi"}],
                "mcp_servers": [{"type": "url", "url": "https://tools.example.com/mcp", "name": "github"}],
                "stream": true
            })
        );
    }
}
