//! Provider adapters, streaming and retries for Switchboard
//!
//! Routes a canonical [`Request`] to one of four wire protocols
//! (chat completions, responses, messages and chat sessions), decodes each
//! provider's stream into one [`StreamEvent`] model, classifies failures
//! into a single [`ErrorCode`] taxonomy and retries transient ones.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod catalog;
pub mod classify;
pub mod convert;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod routing;
pub mod service;
pub mod tracking;
pub mod types;

pub use error::{CanonicalError, ErrorCode};
pub use provider::{Adapter, EventStream};
pub use registry::{
    Attachment, AttachmentStore, ConfiguredModels, ConfiguredToolServers, InMemoryAttachments, ModelRegistry,
    NoAttachments, ToolServer, ToolServerRegistry,
};
pub use retry::RetryPolicy;
pub use routing::ModelResolver;
pub use service::{LlmService, LlmServiceBuilder};
pub use types::{
    ApprovalDecision, ApprovalRequest, AttachmentId, CompletionMessage, Content, ContentPart, GenerationParams,
    Message, ModelConfig, ReasoningEffort, Request, Role, StreamEvent, ToolCall, ToolCallStatus, Turn, Usage,
};
