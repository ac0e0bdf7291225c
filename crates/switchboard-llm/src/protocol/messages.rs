//! Messages (block-streaming) wire format

use serde::{Deserialize, Serialize};

// -- Request types --

/// Message in a request
#[derive(Debug, Clone, Serialize)]
pub struct MessagesMessage {
    /// `user` or `assistant`
    pub role: &'static str,
    pub content: MessagesContent,
}

/// Plain text or an array of content blocks
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessagesContent {
    Text(String),
    Blocks(Vec<MessagesContentBlock>),
}

/// Content block in a request message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagesContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

/// Inline base64 image
#[derive(Debug, Clone, Serialize)]
pub struct ImageSource {
    /// Always `base64`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub media_type: String,
    pub data: String,
}

/// Remote tool server attached to the request
#[derive(Debug, Clone, Serialize)]
pub struct McpServer {
    /// Always `url`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub url: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_configuration: Option<ToolConfiguration>,
}

/// Restricts which tools of a server may be used
#[derive(Debug, Clone, Serialize)]
pub struct ToolConfiguration {
    pub enabled: bool,
    pub allowed_tools: Vec<String>,
}

// -- Streaming types --

/// Streaming event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagesStreamEvent {
    MessageStart {
        message: StreamMessage,
    },
    ContentBlockStart {
        index: u32,
        content_block: StreamContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: StreamDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    /// Stop reason and final usage
    MessageDelta {
        #[serde(default)]
        usage: Option<MessagesUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

/// Partial message in `message_start`
#[derive(Debug, Clone, Deserialize)]
pub struct StreamMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub usage: Option<MessagesUsage>,
}

/// Block opened by `content_block_start`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    /// Client-side tool invocation
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    /// Provider-executed built-in tool invocation
    ServerToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    /// Remote tool server invocation
    McpToolUse {
        id: String,
        name: String,
        #[serde(default)]
        server_name: Option<String>,
        #[serde(default)]
        input: serde_json::Value,
    },
    McpToolResult {
        tool_use_id: String,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        content: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        content: serde_json::Value,
    },
    WebSearchToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

/// Delta in `content_block_delta`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamDelta {
    TextDelta {
        text: String,
    },
    /// Fragment of a tool invocation's JSON input
    InputJsonDelta {
        partial_json: String,
    },
    ThinkingDelta {
        thinking: String,
    },
    #[serde(other)]
    Other,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MessagesUsage {
    #[serde(default)]
    pub input_tokens: Option<u32>,
    #[serde(default)]
    pub output_tokens: Option<u32>,
}
