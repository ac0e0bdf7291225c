//! Adapter trait and the four protocol adapters

pub mod base;
pub mod chat;
pub mod messages;
pub mod responses;
pub mod session;
pub mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use switchboard_config::AdapterKind;

use crate::error::CanonicalError;
use crate::types::{CompletionMessage, ModelConfig, Request, StreamEvent};

pub use chat::ChatCompletionsAdapter;
pub use messages::MessagesAdapter;
pub use responses::ResponsesAdapter;
pub use session::{ChatSession, ChatSessionAdapter};

/// Lazy, cancellable sequence of canonical events
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// One wire protocol, spoken against the canonical request and event model
///
/// `request` has already been merged with the model's defaults by the
/// caller; `model` supplies the provider tag for error attribution.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Protocol family this adapter speaks
    fn kind(&self) -> AdapterKind;

    /// Open a stream
    ///
    /// Failures before the first byte arrives are returned as `Err`; after
    /// that, every failure is an in-band [`StreamEvent::Error`].
    async fn stream(&self, request: &Request, model: &ModelConfig) -> Result<EventStream, CanonicalError>;

    /// Buffer a stream into a single message
    async fn complete(&self, request: &Request, model: &ModelConfig) -> Result<CompletionMessage, CanonicalError> {
        let events = self.stream(request, model).await?;
        collect(events, &model.id).await
    }
}

/// Drain `events` into a [`CompletionMessage`], failing on an error event
pub async fn collect(mut events: EventStream, model: &str) -> Result<CompletionMessage, CanonicalError> {
    let mut content = String::new();
    let mut usage = None;

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::TextDelta(text) => content.push_str(&text),
            StreamEvent::Usage(u) => usage = Some(u),
            StreamEvent::Error(error) => return Err(error),
            StreamEvent::Done => break,
            _ => {}
        }
    }

    Ok(CompletionMessage::new(model, content, usage))
}
