//! Mock provider that replays scripted replies
//!
//! Serves the four protocol endpoints on one listener. Every request pops
//! the next scripted reply and is recorded for later assertions.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing};
use futures_util::stream;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// `200` with the given `data:` payloads
    Sse(Vec<String>),
    /// `200` that sends the payloads, then never finishes
    Stalled(Vec<String>),
    /// Non-2xx with a JSON body and extra headers
    Status {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: serde_json::Value,
    },
}

impl Reply {
    pub fn sse<I, S>(payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::Sse(payloads.into_iter().map(|p| p.to_string()).collect())
    }

    pub fn stalled<I, S>(payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::Stalled(payloads.into_iter().map(|p| p.to_string()).collect())
    }

    pub fn status(status: u16, body: serde_json::Value) -> Self {
        Self::Status {
            status,
            headers: Vec::new(),
            body,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let Self::Status { headers, .. } = &mut self {
            headers.push((name, value.into()));
        }
        self
    }
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct Recorded {
    /// Path and query
    pub uri: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Default)]
struct MockState {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

/// Running mock provider; shuts down on drop
pub struct MockProvider {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockProvider {
    /// Start serving `replies` in order
    pub async fn start(replies: impl IntoIterator<Item = Reply>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle))
            .route("/v1/responses", routing::post(handle))
            .route("/v1/messages", routing::post(handle))
            .route("/v1beta/models/{*rest}", routing::post(handle))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for a versioned API root, e.g. `v1` or `v1beta`
    pub fn base_url(&self, version: &str) -> Url {
        Url::parse(&format!("http://{}/{version}", self.addr)).expect("valid mock URL")
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    state.requests.lock().unwrap().push(Recorded {
        uri: uri.path_and_query().map(ToString::to_string).unwrap_or_default(),
        headers,
        body,
    });

    let reply = state.replies.lock().unwrap().pop_front();
    match reply {
        Some(Reply::Sse(payloads)) => event_stream(Body::from(frames(&payloads))),
        Some(Reply::Stalled(payloads)) => {
            let head = stream::iter([Ok::<_, Infallible>(frames(&payloads))]);
            event_stream(Body::from_stream(futures_util::StreamExt::chain(head, stream::pending())))
        }
        Some(Reply::Status { status, headers, body }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut response = (status, axum::Json(body)).into_response();
            for (name, value) in headers {
                response
                    .headers_mut()
                    .insert(name, value.parse().expect("valid header value"));
            }
            response
        }
        None => (StatusCode::INTERNAL_SERVER_ERROR, "no scripted reply").into_response(),
    }
}

fn frames(payloads: &[String]) -> String {
    payloads.iter().map(|p| format!("data: {p}\n\n")).collect()
}

fn event_stream(body: Body) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}
