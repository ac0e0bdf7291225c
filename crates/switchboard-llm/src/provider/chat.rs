//! Chat-completions adapter

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use switchboard_config::AdapterKind;
use url::Url;

use super::{Adapter, EventStream, base, sse};
use crate::classify;
use crate::convert::chat::{ChatDecoder, build_body};
use crate::error::CanonicalError;
use crate::registry::AttachmentStore;
use crate::types::{ModelConfig, Request};

/// Default chat-completions API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Whether the endpoint is the canonical host rather than a compatible server
///
/// Many compatible servers reject `stream_options`, so usage is only
/// requested from the canonical host.
fn is_canonical_host(url: &Url) -> bool {
    url.host_str().is_some_and(|h| h == "api.openai.com")
}

/// Token-delta SSE with bearer authentication
pub struct ChatCompletionsAdapter {
    client: Client,
    attachments: Arc<dyn AttachmentStore>,
}

impl ChatCompletionsAdapter {
    pub fn new(client: Client, attachments: Arc<dyn AttachmentStore>) -> Self {
        Self { client, attachments }
    }
}

#[async_trait]
impl Adapter for ChatCompletionsAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::ChatCompletions
    }

    async fn stream(&self, request: &Request, model: &ModelConfig) -> Result<EventStream, CanonicalError> {
        let provider = model.provider.as_str();
        if request.is_continuation() {
            return Err(base::continuation_unsupported(provider, self.kind()));
        }

        let url = base::endpoint(provider, request.base_url.as_ref(), DEFAULT_BASE_URL, "chat/completions")?;
        let include_usage = is_canonical_host(&url);
        let messages = base::prepared_messages(request, self.attachments.as_ref());
        let body = build_body(request, &messages, include_usage);

        let mut builder = self
            .client
            .post(url)
            .headers(base::default_headers(provider, true, &request.headers))
            .json(&body);
        if let Some(key) = &request.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        tracing::debug!(provider, model = %request.model, "opening chat completions stream");

        let Some(response) = base::send(builder, &request.cancel, provider, classify::chat_completions).await? else {
            return Ok(base::finished());
        };

        Ok(sse::pump(
            response.bytes_stream(),
            ChatDecoder::new(provider, include_usage),
            request.cancel.clone(),
            provider.to_owned(),
        ))
    }
}
