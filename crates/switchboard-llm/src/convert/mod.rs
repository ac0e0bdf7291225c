//! Conversion between canonical types and each wire format
//!
//! Each module builds the outgoing request body and owns the stream decoder
//! that maps that protocol's frames back to canonical events.

pub mod chat;
pub mod messages;
pub mod responses;
pub mod session;

use serde_json::{Map, Value, json};

use crate::types::{GenerationParams, Message, Role};

/// `{model}` with generation parameters and then custom body fields folded over it
pub fn base_body(model: &str, params: &GenerationParams, custom: &Map<String, Value>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("model".to_owned(), json!(model));

    let fields = [
        ("temperature", params.temperature.map(|v| json!(v))),
        ("max_tokens", params.max_tokens.map(|v| json!(v))),
        ("top_p", params.top_p.map(|v| json!(v))),
        ("frequency_penalty", params.frequency_penalty.map(|v| json!(v))),
        ("presence_penalty", params.presence_penalty.map(|v| json!(v))),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            body.insert(name.to_owned(), value);
        }
    }

    for (key, value) in custom {
        body.insert(key.clone(), value.clone());
    }

    body
}

/// The system prompt override, or the conversation's system messages joined
pub fn system_text(system_prompt: Option<&str>, messages: &[Message]) -> Option<String> {
    if let Some(prompt) = system_prompt {
        return Some(prompt.to_owned());
    }

    let joined = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    (!joined.is_empty()).then_some(joined)
}
