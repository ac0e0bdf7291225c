//! Chat-completions wire format

use serde::{Deserialize, Serialize};

// -- Request types --

/// Stream options (only understood by the canonical host)
#[derive(Debug, Clone, Serialize)]
pub struct ChatStreamOptions {
    /// Include a usage chunk before `[DONE]`
    pub include_usage: bool,
}

/// Message in a chat-completions request
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`
    pub role: &'static str,
    pub content: ChatContent,
}

/// String or array of content parts
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

/// Individual content part
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContentPart {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: ChatImageUrl,
    },
}

/// Image reference, here always a base64 `data:` URI
#[derive(Debug, Clone, Serialize)]
pub struct ChatImageUrl {
    pub url: String,
}

// -- Streaming types --

/// Streaming chunk
///
/// Compatible servers omit most envelope fields, so everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatStreamChoice>,
    /// Present on the final chunk when usage was requested
    #[serde(default)]
    pub usage: Option<ChatUsage>,
    /// Some compatible servers report failures in-band
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Choice within a streaming chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatStreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChatStreamDelta,
    /// Present on the final content chunk
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Delta content within a streaming choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatStreamDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
