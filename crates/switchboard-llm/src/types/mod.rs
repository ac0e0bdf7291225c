//! Canonical, provider-agnostic types
//!
//! Every adapter converts its wire format into these types, so callers only
//! ever see one request shape and one event model.

pub mod message;
pub mod model;
pub mod request;
pub mod response;
pub mod stream;

pub use message::{Content, ContentPart, Message, Role};
pub use model::{ModelCapabilities, ModelConfig};
pub use request::{ApprovalDecision, AttachmentId, GenerationParams, ReasoningEffort, Request, Turn};
pub use response::CompletionMessage;
pub use stream::{ApprovalRequest, StreamEvent, ToolCall, ToolCallStatus, Usage};
