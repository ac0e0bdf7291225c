use serde::Serialize;

use super::Usage;
use crate::error::CanonicalError;

/// Buffered result of a non-streaming completion
#[derive(Debug, Clone, Serialize)]
pub struct CompletionMessage {
    /// Model that produced the content
    pub model: String,
    /// Concatenated assistant text, or the rendered error on failure
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Set when the completion failed after all retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CanonicalError>,
}

impl CompletionMessage {
    /// Successful completion
    pub fn new(model: impl Into<String>, content: impl Into<String>, usage: Option<Usage>) -> Self {
        Self {
            model: model.into(),
            content: content.into(),
            usage,
            error: None,
        }
    }

    /// Failed completion whose content is the rendered error
    pub fn failed(model: impl Into<String>, error: CanonicalError) -> Self {
        Self {
            model: model.into(),
            content: error.render(),
            usage: None,
            error: Some(error),
        }
    }

    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
