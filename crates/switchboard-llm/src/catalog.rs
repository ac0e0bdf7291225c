//! Built-in model catalog

use std::sync::LazyLock;

use switchboard_config::AdapterKind;

use crate::types::ModelConfig;

static CATALOG: LazyLock<Vec<ModelConfig>> = LazyLock::new(|| {
    vec![
        ModelConfig::new("gpt-4o", "GPT-4o", "openai", AdapterKind::ChatCompletions, 128_000).with_vision(),
        ModelConfig::new("gpt-4o-mini", "GPT-4o mini", "openai", AdapterKind::ChatCompletions, 128_000).with_vision(),
        ModelConfig::new("gpt-5", "GPT-5", "openai", AdapterKind::Responses, 400_000).with_vision(),
        ModelConfig::new("o4-mini", "o4-mini", "openai", AdapterKind::Responses, 200_000).with_vision(),
        ModelConfig::new(
            "claude-sonnet-4-20250514",
            "Claude Sonnet 4",
            "anthropic",
            AdapterKind::Messages,
            200_000,
        )
        .with_vision(),
        ModelConfig::new(
            "claude-opus-4-20250514",
            "Claude Opus 4",
            "anthropic",
            AdapterKind::Messages,
            200_000,
        )
        .with_vision(),
        ModelConfig::new(
            "claude-3-5-haiku-20241022",
            "Claude 3.5 Haiku",
            "anthropic",
            AdapterKind::Messages,
            200_000,
        ),
        ModelConfig::new("gemini-2.5-pro", "Gemini 2.5 Pro", "gemini", AdapterKind::ChatSession, 1_048_576).with_vision(),
        ModelConfig::new(
            "gemini-2.5-flash",
            "Gemini 2.5 Flash",
            "gemini",
            AdapterKind::ChatSession,
            1_048_576,
        )
        .with_vision(),
    ]
});

/// Every built-in model
pub fn all() -> &'static [ModelConfig] {
    &CATALOG
}

/// Built-in model with exactly this id
pub fn builtin(id: &str) -> Option<&'static ModelConfig> {
    CATALOG.iter().find(|model| model.id == id)
}
