//! Turn-based chat-session adapter
//!
//! The session holds prior turns and submits one active turn at a time,
//! so the conversation is replayed as history before the last message is
//! sent. There is no tool-call or reasoning support.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use switchboard_config::AdapterKind;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{Adapter, EventStream, base, sse};
use crate::classify;
use crate::convert::session::{SessionDecoder, generation_config, split_turns};
use crate::error::CanonicalError;
use crate::protocol::session::{GenerationConfig, SessionContent, SessionRequest};
use crate::registry::AttachmentStore;
use crate::types::{ModelConfig, Request};

/// Default chat-session API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A conversation opened against one model endpoint
pub struct ChatSession {
    client: Client,
    url: Url,
    headers: HeaderMap,
    history: Vec<SessionContent>,
    system_instruction: Option<SessionContent>,
    generation_config: Option<GenerationConfig>,
    extra_body: Map<String, Value>,
}

impl ChatSession {
    pub fn new(client: Client, url: Url, headers: HeaderMap, history: Vec<SessionContent>) -> Self {
        Self {
            client,
            url,
            headers,
            history,
            system_instruction: None,
            generation_config: None,
            extra_body: Map::new(),
        }
    }

    #[must_use]
    pub fn with_system_instruction(mut self, instruction: Option<SessionContent>) -> Self {
        self.system_instruction = instruction;
        self
    }

    #[must_use]
    pub fn with_generation_config(mut self, config: Option<GenerationConfig>) -> Self {
        self.generation_config = config;
        self
    }

    /// Extra top-level body fields, applied last
    #[must_use]
    pub fn with_extra_body(mut self, body: Map<String, Value>) -> Self {
        self.extra_body = body;
        self
    }

    /// Turns submitted so far, oldest first
    pub fn history(&self) -> &[SessionContent] {
        &self.history
    }

    fn body(&self, message: &SessionContent) -> Value {
        let mut contents = self.history.clone();
        contents.push(message.clone());

        let request = SessionRequest {
            contents,
            system_instruction: self.system_instruction.clone(),
            generation_config: self.generation_config.clone(),
        };

        let mut body = match serde_json::to_value(request) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in &self.extra_body {
            body.insert(key.clone(), value.clone());
        }

        Value::Object(body)
    }

    /// Submit `message` as the active turn and return the streaming response
    ///
    /// The message joins the history once the provider accepts it. Returns
    /// `Ok(None)` when cancelled first.
    pub async fn send_message_stream(
        &mut self,
        message: SessionContent,
        cancel: &CancellationToken,
        provider: &str,
    ) -> Result<Option<Response>, CanonicalError> {
        let builder = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .json(&self.body(&message));

        let response = base::send(builder, cancel, provider, classify::chat_session).await?;
        if response.is_some() {
            self.history.push(message);
        }

        Ok(response)
    }
}

/// Adapter that opens a [`ChatSession`] per request
pub struct ChatSessionAdapter {
    client: Client,
    attachments: Arc<dyn AttachmentStore>,
}

impl ChatSessionAdapter {
    pub fn new(client: Client, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self { client, attachments }
    }
}

#[async_trait]
impl Adapter for ChatSessionAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::ChatSession
    }

    async fn stream(&self, request: &Request, model: &ModelConfig) -> Result<EventStream, CanonicalError> {
        let provider = model.provider.as_str();
        if request.is_continuation() {
            return Err(base::continuation_unsupported(provider, self.kind()));
        }

        let messages = base::prepared_messages(request, self.attachments.as_ref());
        let Some(turns) = split_turns(request.system_prompt.as_deref(), &messages) else {
            return Err(CanonicalError::invalid_request(provider, "no message to send"));
        };

        let path = format!("models/{}:streamGenerateContent?alt=sse", request.model);
        let url = base::endpoint(provider, request.base_url.as_ref(), DEFAULT_BASE_URL, &path)?;

        let mut headers = base::default_headers(provider, true, &request.headers);
        if let Some(key) = &request.api_key {
            let Ok(mut value) = HeaderValue::from_str(key.expose_secret()) else {
                return Err(CanonicalError::invalid_request(provider, "API key is not a valid header value"));
            };
            value.set_sensitive(true);
            headers.insert("x-goog-api-key", value);
        }

        tracing::debug!(
            provider,
            model = %request.model,
            history = turns.history.len(),
            "opening chat session"
        );

        let mut session = ChatSession::new(self.client.clone(), url, headers, turns.history)
            .with_system_instruction(turns.system_instruction)
            .with_generation_config(generation_config(&request.params))
            .with_extra_body(request.body.clone());

        let Some(response) = session.send_message_stream(turns.active, &request.cancel, provider).await? else {
            return Ok(base::finished());
        };

        Ok(sse::pump(
            response.bytes_stream(),
            SessionDecoder::new(provider),
            request.cancel.clone(),
            provider.to_owned(),
        ))
    }
}
