//! Messages adapter: content-block streaming with inline tool use

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderValue;
use secrecy::ExposeSecret;
use switchboard_config::AdapterKind;

use super::{Adapter, EventStream, base, sse};
use crate::classify;
use crate::convert::messages::{MessagesDecoder, build_body};
use crate::error::CanonicalError;
use crate::registry::{AttachmentStore, ToolServerRegistry, usable_servers};
use crate::types::{ModelConfig, Request};

/// Default messages API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Protocol version header value
pub const API_VERSION: &str = "2023-06-01";

/// Beta flag required for remote tool servers
pub const MCP_BETA: &str = "mcp-client-2025-04-04";

/// Block-streaming SSE with an `x-api-key` header
pub struct MessagesAdapter {
    client: Client,
    attachments: Arc<dyn AttachmentStore>,
    tool_servers: Arc<dyn ToolServerRegistry>,
}

impl MessagesAdapter {
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
impl Adapter for MessagesAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Messages
    }

    async fn stream(&self, request: &Request, model: &ModelConfig) -> Result<EventStream, CanonicalError> {
        let provider = model.provider.as_str();
        if request.is_continuation() {
            return Err(base::continuation_unsupported(provider, self.kind()));
        }

        let url = base::endpoint(provider, request.base_url.as_ref(), DEFAULT_BASE_URL, "messages")?;
        let messages = base::prepared_messages(request, self.attachments.as_ref());
        let servers = usable_servers(self.tool_servers.as_ref());
        let body = build_body(request, &messages, &servers);

        let mut headers = base::default_headers(provider, true, &request.headers);
        headers
            .entry("anthropic-version")
            .or_insert(HeaderValue::from_static(API_VERSION));
        if !servers.is_empty() {
            headers
                .entry("anthropic-beta")
                .or_insert(HeaderValue::from_static(MCP_BETA));
        }
        if let Some(key) = &request.api_key {
            match HeaderValue::from_str(key.expose_secret()) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert("x-api-key", value);
                }
                Err(_) => return Err(CanonicalError::invalid_request(provider, "API key is not a valid header value")),
            }
        }

        tracing::debug!(
            provider,
            model = %request.model,
            tool_servers = servers.len(),
            "opening messages stream"
        );

        let builder = self.client.post(url).headers(headers).json(&body);
        let Some(response) = base::send(builder, &request.cancel, provider, classify::messages).await? else {
            return Ok(base::finished());
        };

        Ok(sse::pump(
            response.bytes_stream(),
            MessagesDecoder::new(provider),
            request.cancel.clone(),
            provider.to_owned(),
        ))
    }
}
