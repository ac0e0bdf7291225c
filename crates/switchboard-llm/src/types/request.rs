use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::Message;

/// Sampling and length controls shared by every adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Frequency penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Reasoning effort, honored by the `responses` adapter only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// How hard a reasoning model should think
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Opaque reference to a stored attachment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub String);

impl From<&str> for AttachmentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A user's verdict on a pending tool-call approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// Id of the approval request being answered
    pub approval_request_id: String,
    /// Whether the tool call may proceed
    pub approve: bool,
    /// Optional free-form justification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// What this request asks the provider to do
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// A new turn over the full conversation
    Fresh {
        /// Conversation so far, oldest first
        messages: Vec<Message>,
    },
    /// Resume a paused response after approval decisions
    ///
    /// Only the `responses` adapter can honor this.
    Continuation {
        /// Id of the response that paused for approval
        previous_response_id: String,
        /// Decisions for the outstanding approval requests
        decisions: Vec<ApprovalDecision>,
    },
}

/// A single generation request
#[derive(Debug, Clone)]
pub struct Request {
    /// Model identifier, resolved against the catalog and custom models
    pub model: String,
    /// Conversation or continuation
    pub turn: Turn,
    /// Caller-supplied API key; falls back to configured credentials
    pub api_key: Option<SecretString>,
    /// Caller-supplied base URL; overrides the model's
    pub base_url: Option<Url>,
    /// Extra headers; override the model's defaults
    pub headers: IndexMap<String, String>,
    /// Extra body fields; override the model's defaults
    pub body: serde_json::Map<String, serde_json::Value>,
    /// Sampling controls
    pub params: GenerationParams,
    /// Replaces any system messages in the conversation
    pub system_prompt: Option<String>,
    /// Attachments inlined into the last message
    pub attachments: Vec<AttachmentId>,
    /// Cancels the in-flight attempt and any pending retry
    pub cancel: CancellationToken,
}

impl Request {
    /// Fresh turn over `messages`
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self::with_turn(model, Turn::Fresh { messages })
    }

    /// Continuation of a paused response
    pub fn continuation(
        model: impl Into<String>,
        previous_response_id: impl Into<String>,
        decisions: Vec<ApprovalDecision>,
    ) -> Self {
        Self::with_turn(
            model,
            Turn::Continuation {
                previous_response_id: previous_response_id.into(),
                decisions,
            },
        )
    }

    fn with_turn(model: impl Into<String>, turn: Turn) -> Self {
        Self {
            model: model.into(),
            turn,
            api_key: None,
            base_url: None,
            headers: IndexMap::new(),
            body: serde_json::Map::new(),
            params: GenerationParams::default(),
            system_prompt: None,
            attachments: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.body.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<AttachmentId>) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Conversation messages, empty for a continuation
    pub fn messages(&self) -> &[Message] {
        match &self.turn {
            Turn::Fresh { messages } => messages,
            Turn::Continuation { .. } => &[],
        }
    }

    /// Whether this request resumes a paused response
    pub const fn is_continuation(&self) -> bool {
        matches!(self.turn, Turn::Continuation { .. })
    }
}
