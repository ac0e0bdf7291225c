use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

/// Configuration for a remote tool server, keyed by its label
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolServerConfig {
    /// Server URL; entries with an empty URL are never offered
    #[serde(default)]
    pub url: String,
    /// Whether tool calls must be approved before running
    #[serde(default)]
    pub require_approval: ApprovalMode,
    /// Restrict the tools the provider may call (all when absent)
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    /// Bearer token forwarded to the server
    #[serde(default)]
    pub auth_token: Option<SecretString>,
    /// Extra headers forwarded to the server
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Whether the server is currently offered
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Approval policy for calls to a tool server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Every call pauses for a human decision
    #[default]
    Always,
    /// Calls run without asking
    Never,
}

impl ApprovalMode {
    /// Wire value understood by providers
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Never => "never",
        }
    }
}

const fn default_active() -> bool {
    true
}
