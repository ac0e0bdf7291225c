use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;

/// Lifecycle of a provider-executed tool call
///
/// Statuses only move forward: `Pending` < `Executing` < (`Completed` | `Failed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl ToolCallStatus {
    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Executing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether no further transition is possible
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The later of two statuses; ties keep `self`
    #[must_use]
    pub const fn advance(self, next: Self) -> Self {
        if next.rank() > self.rank() { next } else { self }
    }
}

/// Snapshot of a tool call the provider is running on the caller's behalf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, possibly empty while still streaming
    pub arguments: String,
    /// Tool server that owns the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_label: Option<String>,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The provider paused and wants the user to allow a tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Approval request id, echoed back in an [`crate::ApprovalDecision`]
    pub id: String,
    pub tool_name: String,
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_label: Option<String>,
    /// Response to continue from once decisions are made
    pub response_id: String,
}

/// Token accounting for one response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }
}

/// Canonical streaming event
///
/// Every stream ends with exactly one of [`StreamEvent::Done`] or
/// [`StreamEvent::Error`], and nothing follows it.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Incremental assistant text
    TextDelta(String),
    /// Incremental reasoning summary text
    ReasoningDelta(String),
    /// Full reasoning summary so far, parts joined by blank lines
    ReasoningComplete(String),
    /// A tool call appeared or changed
    ToolCall(ToolCall),
    /// A tool call reached a terminal status
    ToolResult(ToolCall),
    /// Generation paused pending user approval
    ApprovalRequest(ApprovalRequest),
    /// Token usage for the response
    Usage(Usage),
    /// Terminal failure
    Error(CanonicalError),
    /// Terminal success
    Done,
}

impl StreamEvent {
    /// Whether this event ends the stream
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}
