//! Chat-session turn building and stream decoding

use serde::Deserialize;
use serde_json::Value;

use super::system_text;
use crate::classify;
use crate::protocol::session::{GenerationConfig, InlineData, SessionChunk, SessionContent, SessionPart};
use crate::provider::sse::FrameDecoder;
use crate::types::{ContentPart, GenerationParams, Message, Role, StreamEvent, Usage};

/// A conversation split into what a chat session needs
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTurns {
    pub system_instruction: Option<SessionContent>,
    /// Alternating prior turns
    pub history: Vec<SessionContent>,
    /// The turn to submit
    pub active: SessionContent,
}

/// Split messages into history and the active turn
///
/// The final non-system message alone becomes the active turn. Earlier
/// consecutive turns from the same role are merged so history alternates.
/// Returns `None` when there is no non-system message to send.
pub fn split_turns(system_prompt: Option<&str>, messages: &[Message]) -> Option<SessionTurns> {
    let system_instruction = system_text(system_prompt, messages).map(|text| SessionContent {
        role: None,
        parts: vec![SessionPart::text(text)],
    });

    let mut turns = messages.iter().filter_map(|message| {
        let role = match message.role {
            Role::System => return None,
            Role::User => "user",
            Role::Assistant => "model",
        };
        Some((role, message))
    });
    let (active_role, active) = turns.next_back()?;

    let mut history: Vec<SessionContent> = Vec::new();
    for (role, message) in turns {
        let parts = message.content.parts().into_iter().map(to_part);
        match history.last_mut() {
            Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
            _ => history.push(SessionContent {
                role: Some(role.to_owned()),
                parts: parts.collect(),
            }),
        }
    }

    Some(SessionTurns {
        system_instruction,
        history,
        active: SessionContent {
            role: Some(active_role.to_owned()),
            parts: active.content.parts().into_iter().map(to_part).collect(),
        },
    })
}

fn to_part(part: ContentPart) -> SessionPart {
    match part {
        ContentPart::Text { text } => SessionPart::text(text),
        ContentPart::Image { mime_type, data } => SessionPart {
            inline_data: Some(InlineData { mime_type, data }),
            ..SessionPart::default()
        },
    }
}

/// Generation parameters, or `None` when none are set
pub fn generation_config(params: &GenerationParams) -> Option<GenerationConfig> {
    let config = GenerationConfig {
        temperature: params.temperature,
        top_p: params.top_p,
        max_output_tokens: params.max_tokens,
        frequency_penalty: params.frequency_penalty,
        presence_penalty: params.presence_penalty,
    };

    (config != GenerationConfig::default()).then_some(config)
}

/// Decoder for session chunks; the stream ends when the body does
pub struct SessionDecoder {
    provider: String,
    usage: Option<Usage>,
}

impl SessionDecoder {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            usage: None,
        }
    }
}

impl FrameDecoder for SessionDecoder {
    fn decode(&mut self, data: &str) -> Vec<StreamEvent> {
        let data = data.trim();
        if data.is_empty() {
            return Vec::new();
        }

        let raw: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, data = %data, "skipping unparseable SSE chunk");
                return Vec::new();
            }
        };
        let chunk = match SessionChunk::deserialize(&raw) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "skipping chunk with unexpected shape");
                return Vec::new();
            }
        };

        if chunk.error.is_some() {
            return vec![StreamEvent::Error(classify::stream_failure(
                &self.provider,
                classify::chat_session,
                &raw,
            ))];
        }

        if let Some(usage) = chunk.usage_metadata {
            self.usage = Some(Usage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            });
        }

        chunk
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| part.thought != Some(true))
                    .filter_map(|part| part.text.filter(|t| !t.is_empty()))
                    .map(StreamEvent::TextDelta)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(usage) = self.usage.take() {
            events.push(StreamEvent::Usage(usage));
        }
        events.push(StreamEvent::Done);
        events
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorCode;

    fn roles(turns: &[SessionContent]) -> Vec<&str> {
        turns.iter().map(|t| t.role.as_deref().unwrap_or("-")).collect()
    }

    #[test]
    fn history_alternates_and_last_message_is_active() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("one"),
            Message::user("two"),
            Message::assistant("three"),
            Message::user("four"),
        ];

        let turns = split_turns(None, &messages).unwrap();

        assert_eq!(roles(&turns.history), ["user", "model"]);
        assert_eq!(turns.history[0].parts, [SessionPart::text("one"), SessionPart::text("two")]);
        assert_eq!(turns.active.role.as_deref(), Some("user"));
        assert_eq!(turns.active.parts, [SessionPart::text("four")]);
        assert_eq!(
            turns.system_instruction.unwrap().parts,
            [SessionPart::text("be brief")]
        );
    }

    #[test]
    fn only_the_final_message_is_submitted() {
        let messages = vec![Message::user("one"), Message::assistant("two"), Message::user("three"), Message::user("four")];

        let turns = split_turns(None, &messages).unwrap();

        assert_eq!(roles(&turns.history), ["user", "model", "user"]);
        assert_eq!(turns.history[2].parts, [SessionPart::text("three")]);
        assert_eq!(turns.active.parts, [SessionPart::text("four")]);
    }

    #[test]
    fn only_system_messages_yield_nothing() {
        assert!(split_turns(Some("x"), &[Message::system("y")]).is_none());
    }

    #[test]
    fn images_become_inline_data() {
        let mut message = Message::user("look");
        message.content.push(ContentPart::image("image/png", b"abc"));

        let turns = split_turns(None, &[message]).unwrap();
        assert_eq!(
            turns.active.parts[1].inline_data,
            Some(InlineData {
                mime_type: "image/png".into(),
                data: "YWJj".into()
            })
        );
    }

    #[test]
    fn generation_config_only_when_set() {
        assert!(generation_config(&GenerationParams::default()).is_none());

        let config = generation_config(&GenerationParams {
            max_tokens: Some(64),
            top_p: Some(0.5),
            ..GenerationParams::default()
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(config).unwrap(),
            json!({"topP": 0.5, "maxOutputTokens": 64})
        );
    }

    #[test]
    fn decodes_text_and_usage() {
        let mut decoder = SessionDecoder::new("gemini");
        let mut events = decoder.decode(
            &json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "thinking", "thought": true}, {"text": "Hi"}]}}]}).to_string(),
        );
        events.extend(decoder.decode(
            &json!({"candidates": [{"content": {"role": "model", "parts": [{"text": " there"}]}, "finishReason": "STOP"}],
                    "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}})
            .to_string(),
        ));
        events.extend(decoder.finish());

        assert!(matches!(&events[0], StreamEvent::TextDelta(t) if t == "Hi"));
        assert!(matches!(&events[1], StreamEvent::TextDelta(t) if t == " there"));
        assert!(matches!(events[2], StreamEvent::Usage(Usage { total_tokens: 6, .. })));
        assert!(matches!(events[3], StreamEvent::Done));
    }

    #[test]
    fn in_band_error() {
        let mut decoder = SessionDecoder::new("gemini");
        let events = decoder.decode(
            &json!({"error": {"code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE"}}).to_string(),
        );
        let [StreamEvent::Error(error)] = events.as_slice() else {
            panic!("expected error");
        };
        assert_eq!(error.code, ErrorCode::ServerError);
    }
}
