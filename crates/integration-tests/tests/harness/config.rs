//! Programmatic configuration builder for integration tests
//!
//! Emits TOML and runs it through the real loader so tests exercise the
//! same parsing and validation as the binary.

use std::fmt::Write;

use switchboard_config::Config;
use switchboard_llm::LlmService;
use url::Url;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    toml: String,
}

impl ConfigBuilder {
    /// Fast, deterministic retries
    pub fn new() -> Self {
        Self {
            toml: "[retry]\nmax_attempts = 3\nbase_delay = \"10ms\"\nmax_delay = \"100ms\"\njitter = false\n".to_owned(),
        }
    }

    /// Add a custom model served by the mock
    pub fn with_model(self, id: &str, provider: &str, adapter: &str, base_url: &Url) -> Self {
        self.with_raw(&format!(
            "\n[[models]]\nid = \"{id}\"\nprovider = \"{provider}\"\nadapter = \"{adapter}\"\nbase_url = \"{base_url}\"\n"
        ))
    }

    /// Add a tool server
    pub fn with_tool_server(self, label: &str, url: &str, require_approval: &str) -> Self {
        self.with_raw(&format!(
            "\n[tool_servers.{label}]\nurl = \"{url}\"\nrequire_approval = \"{require_approval}\"\n"
        ))
    }

    /// Add a provider credential
    pub fn with_credential(self, provider: &str, key: &str) -> Self {
        self.with_raw(&format!("\n[credentials]\n{provider} = \"{key}\"\n"))
    }

    /// Append arbitrary TOML
    pub fn with_raw(mut self, toml: &str) -> Self {
        let _ = write!(self.toml, "{toml}");
        self
    }

    pub fn build(self) -> Config {
        Config::from_toml(&self.toml).expect("test config is valid")
    }

    pub fn service(self) -> LlmService {
        LlmService::from_config(&self.build())
    }
}
