use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

/// Wire protocol family a model is served through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Token-delta chat completions (`/chat/completions`)
    ChatCompletions,
    /// Event-typed responses with tool calls and approvals (`/responses`)
    Responses,
    /// Content-block message streaming (`/messages`)
    Messages,
    /// Turn-based chat session (`:streamGenerateContent`)
    ChatSession,
}

impl AdapterKind {
    /// Stable tag used in configuration and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatCompletions => "chat_completions",
            Self::Responses => "responses",
            Self::Messages => "messages",
            Self::ChatSession => "chat_session",
        }
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined model entry in the model registry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomModelConfig {
    /// Identifier callers use to select the model
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Provider tag (used for credential lookup and error attribution)
    pub provider: String,
    /// Adapter that speaks this provider's protocol
    pub adapter: AdapterKind,
    /// Endpoint base URL
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Context window size in tokens
    #[serde(default = "default_context_window")]
    pub context_window: u32,
    /// Whether the entry is currently offered
    #[serde(default = "default_true")]
    pub active: bool,
    /// Default headers sent with every request for this model
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Default body parameters merged into every request for this model
    #[serde(default)]
    pub body: serde_json::Map<String, serde_json::Value>,
    /// Capability flags
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

/// Capability flags for a user-defined model
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilitiesConfig {
    /// Accepts image input
    #[serde(default)]
    pub vision: bool,
    /// Supports streaming responses
    #[serde(default = "default_true")]
    pub streaming: bool,
    /// Accepts a system role message
    #[serde(default = "default_true")]
    pub system_role: bool,
    /// Generation parameters the model accepts (empty means all)
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            vision: false,
            streaming: true,
            system_role: true,
            parameters: Vec::new(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_context_window() -> u32 {
    8192
}
