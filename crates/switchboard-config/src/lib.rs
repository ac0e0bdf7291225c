#![allow(clippy::must_use_candidate)]

mod env;
pub mod llm;
mod loader;
pub mod retry;
pub mod telemetry;
pub mod tool_servers;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

pub use llm::*;
pub use retry::*;
pub use telemetry::{LogFormat, TelemetryConfig};
pub use tool_servers::*;

/// Top-level Switchboard configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Retry policy for provider calls
    #[serde(default)]
    pub retry: RetryConfig,
    /// API keys keyed by provider tag, used when a request carries none
    #[serde(default)]
    pub credentials: IndexMap<String, SecretString>,
    /// User-defined models, consulted after the built-in catalog
    #[serde(default)]
    pub models: Vec<CustomModelConfig>,
    /// Remote tool servers offered to tool-capable providers
    #[serde(default)]
    pub tool_servers: IndexMap<String, ToolServerConfig>,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
