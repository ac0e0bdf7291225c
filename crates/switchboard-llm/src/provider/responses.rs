//! Responses adapter: tool calls, approvals, reasoning and continuation

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use switchboard_config::AdapterKind;

use super::{Adapter, EventStream, base, sse};
use crate::classify;
use crate::convert::responses::{ResponsesDecoder, build_body};
use crate::error::CanonicalError;
use crate::registry::{AttachmentStore, ToolServerRegistry, usable_servers};
use crate::types::{ModelConfig, Request, Turn};

/// Default responses API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Event-typed SSE with bearer authentication
pub struct ResponsesAdapter {
    client: Client,
    attachments: Arc<dyn AttachmentStore>,
    tool_servers: Arc<dyn ToolServerRegistry>,
}

impl ResponsesAdapter {
    pub fn new(
        client: Client,
        attachments: Arc<dyn AttachmentStore>,
        tool_servers: Arc<dyn ToolServerRegistry>,
    ) -> Self {
        Self {
            client,
            attachments,
            tool_servers,
        }
    }
}

#[async_trait]
impl Adapter for ResponsesAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Responses
    }

    async fn stream(&self, request: &Request, model: &ModelConfig) -> Result<EventStream, CanonicalError> {
        let provider = model.provider.as_str();
        let url = base::endpoint(provider, request.base_url.as_ref(), DEFAULT_BASE_URL, "responses")?;

        let messages = base::prepared_messages(request, self.attachments.as_ref());
        let servers = usable_servers(self.tool_servers.as_ref());
        let body = build_body(request, &messages, &servers);

        let mut builder = self
            .client
            .post(url)
            .headers(base::default_headers(provider, true, &request.headers))
            .json(&body);
        if let Some(key) = &request.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        match &request.turn {
            Turn::Fresh { messages } => tracing::debug!(
                provider,
                model = %request.model,
                messages = messages.len(),
                tool_servers = servers.len(),
                "opening responses stream"
            ),
            Turn::Continuation {
                previous_response_id,
                decisions,
            } => tracing::debug!(
                provider,
                model = %request.model,
                previous_response_id = %previous_response_id,
                decisions = decisions.len(),
                tool_servers = servers.len(),
                "continuing response"
            ),
        }

        let Some(response) = base::send(builder, &request.cancel, provider, classify::responses).await? else {
            return Ok(base::finished());
        };

        Ok(sse::pump(
            response.bytes_stream(),
            ResponsesDecoder::new(provider),
            request.cancel.clone(),
            provider.to_owned(),
        ))
    }
}
