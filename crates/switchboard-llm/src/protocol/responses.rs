//! Responses (event-typed) wire format

use serde::{Deserialize, Serialize};

// -- Request types --

/// One input message
#[derive(Debug, Clone, Serialize)]
pub struct InputMessage {
    /// `user` or `assistant`
    pub role: &'static str,
    pub content: Vec<InputContent>,
}

/// Content part of an input message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContent {
    InputText { text: String },
    /// Assistant turns replayed from history
    OutputText { text: String },
    InputImage { image_url: String },
}

/// Answer to an approval request, sent on continuation
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalResponse {
    /// Always `mcp_approval_response`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub approve: bool,
    pub approval_request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Remote tool server attached to the response
#[derive(Debug, Clone, Serialize)]
pub struct McpTool {
    /// Always `mcp`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub server_label: String,
    pub server_url: String,
    /// `always` or `never`
    pub require_approval: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "indexmap::IndexMap::is_empty")]
    pub headers: indexmap::IndexMap<String, String>,
}

/// Reasoning controls
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningConfig {
    pub effort: &'static str,
    pub summary: &'static str,
}

// -- Streaming types --

/// One streamed frame
///
/// The frame carries a `type` discriminant plus whichever fields that type
/// uses; everything else is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesFrame {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub delta: Option<String>,
    /// Final text of a `.done` frame
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub summary_index: Option<u32>,
    #[serde(default)]
    pub item: Option<OutputItem>,
    #[serde(default)]
    pub response: Option<ResponseEnvelope>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    /// Legacy shape: a fully-formed output array on the frame itself
    #[serde(default)]
    pub output: Option<Vec<OutputItem>>,
}

/// The `response` object carried by lifecycle frames
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub usage: Option<ResponsesUsage>,
    #[serde(default)]
    pub incomplete_details: Option<serde_json::Value>,
    /// Legacy shape nested under the response
    #[serde(default)]
    pub output: Option<Vec<OutputItem>>,
}

/// Output item
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    McpCall {
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        arguments: String,
        #[serde(default)]
        server_label: Option<String>,
        #[serde(default)]
        output: Option<String>,
        #[serde(default)]
        error: Option<serde_json::Value>,
    },
    McpApprovalRequest {
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        arguments: String,
        #[serde(default)]
        server_label: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Content of a message output item
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    OutputText {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Token usage reported on completion
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ResponsesUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
