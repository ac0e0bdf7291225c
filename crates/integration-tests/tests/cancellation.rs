mod harness;

use std::time::Duration;

use futures_util::StreamExt;
use harness::config::ConfigBuilder;
use harness::mock_provider::{MockProvider, Reply};
use serde_json::json;
use switchboard_llm::{Message, Request, StreamEvent};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cancelling_mid_stream_ends_with_done() {
    let mock = MockProvider::start([Reply::stalled([
        json!({"choices": [{"index": 0, "delta": {"content": "Hello"}}]}),
    ])])
    .await
    .unwrap();
    let service = ConfigBuilder::new()
        .with_model("mock-chat", "mock", "chat_completions", &mock.base_url("v1"))
        .service();
    let cancel = CancellationToken::new();

    let mut events = service.stream_with_retry(
        Request::new("mock-chat", vec![Message::user("Hi")]).with_cancel(cancel.clone()),
    );

    let first = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .expect("first event in time");
    assert!(matches!(first, Some(StreamEvent::TextDelta(t)) if t == "Hello"));

    cancel.cancel();

    let rest: Vec<_> = tokio::time::timeout(Duration::from_secs(5), events.collect::<Vec<_>>())
        .await
        .expect("stream ends after cancel");
    assert!(matches!(rest.as_slice(), [StreamEvent::Done]));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn cancelled_before_send_makes_no_retry() {
    let mock = MockProvider::start([Reply::status(503, json!({"error": {"message": "down"}}))])
        .await
        .unwrap();
    let service = ConfigBuilder::new()
        .with_model("mock-chat", "mock", "chat_completions", &mock.base_url("v1"))
        .service();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let events: Vec<_> = service
        .stream_with_retry(Request::new("mock-chat", vec![Message::user("Hi")]).with_cancel(cancel))
        .collect()
        .await;

    assert!(matches!(events.as_slice(), [StreamEvent::Done]));
    assert!(mock.request_count() <= 1);
}
