//! Server-sent-event pump
//!
//! A spawned task reads the response body through `eventsource-stream`,
//! hands each `data:` payload to an adapter-specific decoder and forwards
//! the resulting events over a bounded channel. The task, not the consumer,
//! guarantees that exactly one terminal event is sent.

use std::fmt;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::EventStream;
use crate::classify;
use crate::types::StreamEvent;

const CHANNEL_CAPACITY: usize = 64;

/// Turns SSE `data:` payloads into canonical events
pub trait FrameDecoder: Send + 'static {
    /// Decode one payload; unparseable payloads yield nothing
    fn decode(&mut self, data: &str) -> Vec<StreamEvent>;

    /// Called when the body ends; a completion marker is appended if the
    /// returned events hold no terminal event
    fn finish(&mut self) -> Vec<StreamEvent> {
        Vec::new()
    }
}

/// Spawn the pump for `bytes` and return its event stream
pub fn pump<S, B, E, D>(bytes: S, mut decoder: D, cancel: CancellationToken, provider: String) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: fmt::Display + Send,
    D: FrameDecoder,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let mut frames = std::pin::pin!(bytes.eventsource());

        loop {
            let next = tokio::select! {
                biased;
                () = task_cancel.cancelled() => {
                    tracing::debug!(provider = %provider, "stream cancelled");
                    let _ = tx.send(StreamEvent::Done).await;
                    return;
                }
                next = frames.next() => next,
            };

            let events = match next {
                Some(Ok(frame)) => decoder.decode(&frame.data),
                Some(Err(e)) => {
                    tracing::error!(provider = %provider, error = %e, "stream read failed");
                    vec![StreamEvent::Error(classify::read_failure(&provider, e.to_string()))]
                }
                None => {
                    let mut tail = decoder.finish();
                    if !tail.iter().any(StreamEvent::is_terminal) {
                        tail.push(StreamEvent::Done);
                    }
                    tail
                }
            };

            for event in events {
                let terminal = event.is_terminal();
                if tx.send(event).await.is_err() {
                    tracing::debug!(provider = %provider, "consumer dropped stream");
                    return;
                }
                if terminal {
                    return;
                }
            }
        }
    });

    channel_stream(rx, cancel)
}

/// Expose a channel as an [`EventStream`] that honors cancellation
///
/// Once `cancel` fires, anything still queued is discarded and the stream
/// ends with a completion marker. The stream also ends after the first
/// terminal event.
pub fn channel_stream(rx: mpsc::Receiver<StreamEvent>, cancel: CancellationToken) -> EventStream {
    Box::pin(futures_util::stream::unfold(Some((rx, cancel)), |state| async move {
        let (mut rx, cancel) = state?;

        let received = tokio::select! {
            biased;
            () = cancel.cancelled() => Some(StreamEvent::Done),
            event = rx.recv() => event,
        };
        let event = received?;

        let next = (!event.is_terminal()).then_some((rx, cancel));
        Some((event, next))
    }))
}
