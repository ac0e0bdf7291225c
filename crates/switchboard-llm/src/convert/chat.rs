//! Chat-completions body building and stream decoding

use serde::Deserialize;
use serde_json::{Value, json};

use super::base_body;
use crate::classify;
use crate::protocol::chat::{ChatContent, ChatContentPart, ChatImageUrl, ChatMessage, ChatStreamChunk, ChatStreamOptions};
use crate::provider::sse::FrameDecoder;
use crate::types::{Content, ContentPart, Message, Request, Role, StreamEvent, Usage};

/// Build the streaming request body
///
/// A system prompt override replaces the conversation's system messages
/// with one leading system message.
pub fn build_body(request: &Request, messages: &[Message], include_usage: bool) -> Value {
    let mut body = base_body(&request.model, &request.params, &request.body);

    let mut wire = Vec::with_capacity(messages.len() + 1);
    if let Some(prompt) = &request.system_prompt {
        wire.push(ChatMessage {
            role: "system",
            content: ChatContent::Text(prompt.clone()),
        });
    }
    wire.extend(
        messages
            .iter()
            .filter(|m| request.system_prompt.is_none() || m.role != Role::System)
            .map(to_wire),
    );

    body.insert("messages".to_owned(), json!(wire));
    body.insert("stream".to_owned(), json!(true));
    if include_usage {
        body.insert(
            "stream_options".to_owned(),
            json!(ChatStreamOptions { include_usage: true }),
        );
    }

    Value::Object(body)
}

fn to_wire(message: &Message) -> ChatMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    let content = match &message.content {
        Content::Text(text) => ChatContent::Text(text.clone()),
        Content::Parts(parts) => ChatContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => ChatContentPart::Text { text: text.clone() },
                    ContentPart::Image { .. } => ChatContentPart::ImageUrl {
                        image_url: ChatImageUrl {
                            url: part.data_uri().unwrap_or_default(),
                        },
                    },
                })
                .collect(),
        ),
    };

    ChatMessage { role, content }
}

/// Decoder for token-delta frames terminated by `[DONE]`
pub struct ChatDecoder {
    provider: String,
    /// Usage was requested, so it arrives after `finish_reason`
    expects_usage: bool,
    finished: bool,
    usage: Option<Usage>,
}

impl ChatDecoder {
    pub fn new(provider: impl Into<String>, expects_usage: bool) -> Self {
        Self {
            provider: provider.into(),
            expects_usage,
            finished: false,
            usage: None,
        }
    }

    fn complete(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(usage) = self.usage.take() {
            events.push(StreamEvent::Usage(usage));
        }
        events.push(StreamEvent::Done);
        events
    }
}

impl FrameDecoder for ChatDecoder {
    fn decode(&mut self, data: &str) -> Vec<StreamEvent> {
        let data = data.trim();
        if data.is_empty() {
            return Vec::new();
        }
        if data == "[DONE]" {
            return self.complete();
        }

        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                return Vec::new();
            }
        };

        if value.get("error").is_some_and(|e| !e.is_null()) {
            let error = classify::stream_failure(&self.provider, classify::chat_completions, &value);
            return vec![StreamEvent::Error(error)];
        }

        let chunk = match ChatStreamChunk::deserialize(&value) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "skipping chunk with unexpected shape");
                return Vec::new();
            }
        };

        let mut events = Vec::new();

        if let Some(choice) = chunk.choices.first() {
            if let Some(text) = choice.delta.content.as_deref().filter(|t| !t.is_empty()) {
                events.push(StreamEvent::TextDelta(text.to_owned()));
            }
            if choice.finish_reason.is_some() {
                self.finished = true;
            }
        }

        if let Some(usage) = chunk.usage {
            self.usage = Some(Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            });
        }

        if self.finished && (!self.expects_usage || self.usage.is_some()) {
            events.extend(self.complete());
        }

        events
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        self.complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn decode_all(decoder: &mut ChatDecoder, frames: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for frame in frames {
            for event in decoder.decode(frame) {
                out.push(match event {
                    StreamEvent::TextDelta(t) => format!("text:{t}"),
                    StreamEvent::Usage(u) => format!("usage:{}/{}", u.input_tokens, u.output_tokens),
                    StreamEvent::Done => "done".to_owned(),
                    StreamEvent::Error(e) => format!("error:{}", e.code),
                    other => format!("{other:?}"),
                });
            }
        }
        out
    }

    #[test]
    fn token_deltas_then_done() {
        let mut decoder = ChatDecoder::new("openai", false);
        let events = decode_all(
            &mut decoder,
            &[
                r#"{"choices":[{"delta":{"content":"Hi"}}]}"#,
                r#"{"choices":[{"delta":{"content":" there"}}]}"#,
                "[DONE]",
            ],
        );
        assert_eq!(events, ["text:Hi", "text: there", "done"]);
    }

    #[test]
    fn finish_reason_completes_without_usage() {
        let mut decoder = ChatDecoder::new("local", false);
        let events = decode_all(
            &mut decoder,
            &[r#"{"choices":[{"delta":{"content":"ok"},"finish_reason":"stop"}]}"#],
        );
        assert_eq!(events, ["text:ok", "done"]);
    }

    #[test]
    fn usage_chunk_follows_finish_reason() {
        let mut decoder = ChatDecoder::new("openai", true);
        let events = decode_all(
            &mut decoder,
            &[
                r#"{"id":"c1","model":"gpt-4o","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
                r#"{"choices":[{"index":0,"delta":{"content":"ok"},"finish_reason":null}]}"#,
                r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
                r#"{"choices":[],"usage":{"prompt_tokens":5,"completion_tokens":1,"total_tokens":6}}"#,
            ],
        );
        assert_eq!(events, ["text:ok", "usage:5/1", "done"]);
    }

    #[test]
    fn in_band_error() {
        let mut decoder = ChatDecoder::new("openrouter", false);
        let events = decoder.decode(r#"{"error":{"message":"Provider overloaded","code":503}}"#);
        let [StreamEvent::Error(error)] = events.as_slice() else {
            panic!("expected one error, got {events:?}");
        };
        assert_eq!(error.code, ErrorCode::ServerError);
        assert_eq!(error.provider, "openrouter");
    }

    #[test]
    fn skips_garbage() {
        let mut decoder = ChatDecoder::new("openai", false);
        assert!(decoder.decode("not json").is_empty());
        assert!(decoder.decode("").is_empty());
    }

    #[test]
    fn body_with_override_and_image() {
        let mut user = Message::user("what is this");
        user.content.push(ContentPart::image("image/png", b"abc"));
        let messages = vec![Message::system("be terse"), user];

        let request = Request::new("gpt-4o", messages.clone()).with_system_prompt("be kind");
        let body = build_body(&request, &messages, true);

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "be kind"},
                    {"role": "user", "content": [
                        {"type": "text", "text": "what is this"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,YWJj"}}
                    ]}
                ],
                "stream": true,
                "stream_options": {"include_usage": true}
            })
        );
    }

    #[test]
    fn body_keeps_system_messages_without_override() {
        let messages = vec![Message::system("be terse"), Message::user("hi")];
        let request = Request::new("llama", messages.clone());
        let body = build_body(&request, &messages, false);

        assert_eq!(body["messages"][0], json!({"role": "system", "content": "be terse"}));
        assert!(body.get("stream_options").is_none());
    }
}
