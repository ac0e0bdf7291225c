//! Orchestration: resolve, merge, adapt and retry
//!
//! One [`LlmService`] is built at start-up and cloned wherever it is needed.
//! All per-call state lives in the spawned attempt loop, so concurrent calls
//! share nothing mutable.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use indexmap::IndexMap;
use reqwest::Client;
use secrecy::SecretString;
use switchboard_config::{AdapterKind, Config};
use tokio::sync::mpsc;

use crate::error::{CanonicalError, ErrorCode};
use crate::provider::{
    Adapter, ChatCompletionsAdapter, ChatSessionAdapter, EventStream, MessagesAdapter, ResponsesAdapter, sse,
};
use crate::registry::{
    AttachmentStore, ConfiguredModels, ConfiguredToolServers, ModelRegistry, NoAttachments, ToolServerRegistry,
};
use crate::retry::RetryPolicy;
use crate::routing::ModelResolver;
use crate::types::{CompletionMessage, ModelConfig, Request, StreamEvent};

/// Provider tag for failures raised before any provider is involved
pub const SERVICE_PROVIDER: &str = "switchboard";

const CHANNEL_CAPACITY: usize = 64;

/// Entry point for generating completions
#[derive(Clone)]
pub struct LlmService {
    inner: Arc<Inner>,
}

struct Inner {
    resolver: ModelResolver,
    adapters: HashMap<AdapterKind, Arc<dyn Adapter>>,
    retry: RetryPolicy,
    credentials: IndexMap<String, SecretString>,
}

/// Resolved model, merged request and the adapter that will serve it
struct Prepared {
    adapter: Arc<dyn Adapter>,
    request: Request,
    model: ModelConfig,
}

impl LlmService {
    pub fn builder() -> LlmServiceBuilder {
        LlmServiceBuilder::default()
    }

    /// Service wired to the configured models, tool servers and credentials
    pub fn from_config(config: &Config) -> Self {
        Self::builder()
            .retry(RetryPolicy::from(&config.retry))
            .model_registry(Arc::new(ConfiguredModels::new(&config.models)))
            .tool_servers(Arc::new(ConfiguredToolServers::new(&config.tool_servers)))
            .credentials(config.credentials.clone())
            .build()
    }

    fn prepare(&self, mut request: Request) -> Result<Prepared, CanonicalError> {
        let Some(model) = self.inner.resolver.resolve(&request.model) else {
            tracing::warn!(model = %request.model, "model not found");
            return Err(CanonicalError::new(
                ErrorCode::ModelNotFound,
                SERVICE_PROVIDER,
                format!("model '{}' is not available", request.model),
            ));
        };

        let Some(adapter) = self.inner.adapters.get(&model.adapter).cloned() else {
            return Err(CanonicalError::invalid_request(
                &model.provider,
                format!("no adapter registered for {}", model.adapter),
            ));
        };

        if request.base_url.is_none() {
            request.base_url.clone_from(&model.base_url);
        }

        let mut headers = model.default_headers.clone();
        headers.extend(std::mem::take(&mut request.headers));
        request.headers = headers;

        let mut body = model.default_body.clone();
        body.extend(std::mem::take(&mut request.body));
        request.body = body;

        if request.api_key.is_none() {
            request.api_key = self.inner.credentials.get(&model.provider).cloned();
        }

        tracing::info!(
            model = %model.id,
            provider = %model.provider,
            adapter = %model.adapter,
            continuation = request.is_continuation(),
            "resolved model"
        );

        Ok(Prepared { adapter, request, model })
    }

    /// Stream a completion, retrying transient failures that happen before
    /// anything has been forwarded
    ///
    /// The returned stream always ends with exactly one [`StreamEvent::Done`]
    /// or [`StreamEvent::Error`]. Cancelling the request's token ends it
    /// with `Done`.
    pub fn stream_with_retry(&self, request: Request) -> EventStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = request.cancel.clone();
        let service = self.clone();

        tokio::spawn(async move {
            let terminal = service.drive(request, &tx).await;
            let _ = tx.send(terminal).await;
        });

        sse::channel_stream(rx, cancel)
    }

    /// Run the attempt loop, forwarding events to `tx`
    ///
    /// Returns the terminal event still to be sent.
    async fn drive(&self, request: Request, tx: &mpsc::Sender<StreamEvent>) -> StreamEvent {
        let Prepared { adapter, request, model } = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(error) => return StreamEvent::Error(error),
        };
        let policy = &self.inner.retry;
        let cancel = &request.cancel;
        let mut attempt = 1;

        loop {
            let mut committed = false;

            let failure = match adapter.stream(&request, &model).await {
                Err(error) => error,
                Ok(mut events) => {
                    let mut failure = None;
                    while let Some(event) = events.next().await {
                        match event {
                            StreamEvent::Error(error) => {
                                failure = Some(error);
                                break;
                            }
                            StreamEvent::Done => return StreamEvent::Done,
                            event => {
                                committed = true;
                                if tx.send(event).await.is_err() {
                                    tracing::debug!(model = %model.id, "consumer dropped stream");
                                    return StreamEvent::Done;
                                }
                            }
                        }
                    }

                    match failure {
                        Some(error) => error,
                        None => return StreamEvent::Done,
                    }
                }
            };

            if cancel.is_cancelled() {
                return StreamEvent::Done;
            }

            if committed || !failure.is_retryable() || attempt >= policy.max_attempts {
                tracing::warn!(
                    model = %model.id,
                    attempt,
                    committed,
                    code = %failure.code,
                    error = %failure,
                    "stream failed"
                );
                return StreamEvent::Error(failure);
            }

            let delay = policy.stream_delay(attempt, failure.retry_after());
            tracing::warn!(
                model = %model.id,
                attempt,
                max_attempts = policy.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                code = %failure.code,
                "retrying stream"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return StreamEvent::Done,
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    /// Buffer a completion, retrying transient failures
    ///
    /// Never fails: when every attempt fails, the returned message carries
    /// the rendered error as its content. Cancelling the request's token
    /// stops retrying and yields whatever the current attempt buffered.
    pub async fn complete_with_retry(&self, request: Request) -> CompletionMessage {
        let model_id = request.model.clone();
        let Prepared { adapter, request, model } = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(error) => return CompletionMessage::failed(model_id, error),
        };

        let (adapter, request_ref, model_ref) = (&adapter, &request, &model);
        let result = self
            .inner
            .retry
            .run(
                &request.cancel,
                move || adapter.complete(request_ref, model_ref),
                CanonicalError::is_retryable,
                CanonicalError::retry_after,
            )
            .await;

        match result {
            Some(Ok(message)) => message,
            Some(Err(error)) => {
                tracing::warn!(model = %model.id, code = %error.code, error = %error, "completion failed");
                CompletionMessage::failed(model.id, error)
            }
            None => {
                tracing::debug!(model = %model.id, "completion cancelled");
                CompletionMessage::new(model.id, String::new(), None)
            }
        }
    }
}

/// Builder for [`LlmService`]
#[derive(Default)]
pub struct LlmServiceBuilder {
    retry: RetryPolicy,
    models: Option<Arc<dyn ModelRegistry>>,
    tool_servers: Option<Arc<dyn ToolServerRegistry>>,
    attachments: Option<Arc<dyn AttachmentStore>>,
    credentials: IndexMap<String, SecretString>,
    client: Option<Client>,
    adapters: HashMap<AdapterKind, Arc<dyn Adapter>>,
    skip_default_adapters: bool,
}

impl LlmServiceBuilder {
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    #[must_use]
    pub fn model_registry(mut self, registry: Arc<dyn ModelRegistry>) -> Self {
        self.models = Some(registry);
        self
    }

    #[must_use]
    pub fn tool_servers(mut self, registry: Arc<dyn ToolServerRegistry>) -> Self {
        self.tool_servers = Some(registry);
        self
    }

    #[must_use]
    pub fn attachments(mut self, store: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = Some(store);
        self
    }

    /// API keys by provider tag, used when a request carries none
    #[must_use]
    pub fn credentials(mut self, credentials: IndexMap<String, SecretString>) -> Self {
        self.credentials = credentials;
        self
    }

    /// HTTP client shared by the default adapters
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Serve `kind` with `adapter` instead of the default
    #[must_use]
    pub fn adapter(mut self, kind: AdapterKind, adapter: Arc<dyn Adapter>) -> Self {
        self.adapters.insert(kind, adapter);
        self
    }

    /// Register only adapters added with [`Self::adapter`]
    #[must_use]
    pub const fn without_default_adapters(mut self) -> Self {
        self.skip_default_adapters = true;
        self
    }

    pub fn build(self) -> LlmService {
        let models = self
            .models
            .unwrap_or_else(|| Arc::new(ConfiguredModels::new(&[])));
        let tool_servers = self
            .tool_servers
            .unwrap_or_else(|| Arc::new(ConfiguredToolServers::new(&IndexMap::new())));
        let attachments = self.attachments.unwrap_or_else(|| Arc::new(NoAttachments));

        let mut adapters: HashMap<AdapterKind, Arc<dyn Adapter>> = HashMap::new();
        if !self.skip_default_adapters {
            let client = self.client.unwrap_or_default();
            adapters.insert(
                AdapterKind::ChatCompletions,
                Arc::new(ChatCompletionsAdapter::new(client.clone(), attachments.clone())),
            );
            adapters.insert(
                AdapterKind::Responses,
                Arc::new(ResponsesAdapter::new(
                    client.clone(),
                    attachments.clone(),
                    tool_servers.clone(),
                )),
            );
            adapters.insert(
                AdapterKind::Messages,
                Arc::new(MessagesAdapter::new(client.clone(), attachments.clone(), tool_servers)),
            );
            adapters.insert(
                AdapterKind::ChatSession,
                Arc::new(ChatSessionAdapter::new(client, attachments)),
            );
        }
        adapters.extend(self.adapters);

        LlmService {
            inner: Arc::new(Inner {
                resolver: ModelResolver::new(models),
                adapters,
                retry: self.retry,
                credentials: self.credentials,
            }),
        }
    }
}
