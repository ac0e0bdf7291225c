//! Plumbing shared by the HTTP adapters

use indexmap::IndexMap;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, Response};
use switchboard_config::AdapterKind;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::EventStream;
use crate::classify::{self, Extractor};
use crate::error::CanonicalError;
use crate::registry::AttachmentStore;
use crate::types::{ContentPart, Message, Request, StreamEvent};

/// Content type, event-stream accept and caller headers, in that order
///
/// Header names or values that are not valid HTTP are skipped.
pub fn default_headers(provider: &str, streaming: bool, custom: &IndexMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if streaming {
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    }

    for (name, value) in custom {
        match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(provider, header = %name, "skipping invalid custom header"),
        }
    }

    headers
}

/// Join `path` onto the base URL, or onto `default` when none is set
pub fn endpoint(provider: &str, base: Option<&Url>, default: &str, path: &str) -> Result<Url, CanonicalError> {
    let base = base.map_or(default, Url::as_str).trim_end_matches('/');
    let raw = format!("{base}/{path}");
    Url::parse(&raw).map_err(|e| CanonicalError::invalid_request(provider, format!("invalid endpoint {raw}: {e}")))
}

/// Conversation messages with resolved attachments appended to the last one
pub fn prepared_messages(request: &Request, store: &dyn AttachmentStore) -> Vec<Message> {
    let mut messages = request.messages().to_vec();

    if request.attachments.is_empty() {
        return messages;
    }

    let Some(last) = messages.last_mut() else {
        tracing::debug!("attachments ignored: no message to attach to");
        return messages;
    };

    for attachment in store.resolve(&request.attachments) {
        last.content.push(ContentPart::image(attachment.mime_type, &attachment.bytes));
    }

    messages
}

/// Error for a continuation sent to an adapter that cannot chain responses
pub fn continuation_unsupported(provider: &str, kind: AdapterKind) -> CanonicalError {
    CanonicalError::invalid_request(
        provider,
        format!("the {kind} adapter cannot continue a previous response"),
    )
}

/// Send the request, racing it against cancellation
///
/// Returns `Ok(None)` when cancelled before a usable response arrived.
pub async fn send(
    builder: RequestBuilder,
    cancel: &CancellationToken,
    provider: &str,
    extract: Extractor,
) -> Result<Option<Response>, CanonicalError> {
    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(provider, "request cancelled before response");
            return Ok(None);
        }
        result = builder.send() => result.map_err(|e| {
            tracing::error!(provider, error = %e, "upstream request failed");
            classify::transport(provider, &e)
        })?,
    };

    if response.status().is_success() {
        return Ok(Some(response));
    }

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(None),
        body = response.text() => body.unwrap_or_default(),
    };

    let error = classify::http_failure(provider, extract, status, &headers, &body);
    tracing::warn!(
        provider,
        status,
        code = %error.code,
        request_id = error.request_id.as_deref().unwrap_or("-"),
        "upstream returned error"
    );

    Err(error)
}

/// Stream holding only the completion marker
pub fn finished() -> EventStream {
    Box::pin(futures_util::stream::iter([StreamEvent::Done]))
}
