use indexmap::IndexMap;
use switchboard_config::{AdapterKind, CustomModelConfig};
use url::Url;

/// Everything needed to talk to one model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Identifier callers pass in [`crate::Request::model`]
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    /// Context window in tokens
    pub context_window: u32,
    /// Provider tag, used for credentials and error attribution
    pub provider: String,
    /// Wire protocol family
    pub adapter: AdapterKind,
    /// Endpoint override
    pub base_url: Option<Url>,
    /// Headers sent with every request
    pub default_headers: IndexMap<String, String>,
    /// Body fields merged into every request
    pub default_body: serde_json::Map<String, serde_json::Value>,
    /// Advertised features
    pub capabilities: ModelCapabilities,
}

/// Features a model advertises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub vision: bool,
    pub streaming: bool,
    pub system_role: bool,
    /// Generation parameters the model accepts
    pub parameters: Vec<String>,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            vision: false,
            streaming: true,
            system_role: true,
            parameters: Vec::new(),
        }
    }
}

impl ModelConfig {
    /// Minimal entry, used by the built-in catalog
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        provider: impl Into<String>,
        adapter: AdapterKind,
        context_window: u32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            context_window,
            provider: provider.into(),
            adapter,
            base_url: None,
            default_headers: IndexMap::new(),
            default_body: serde_json::Map::new(),
            capabilities: ModelCapabilities::default(),
        }
    }

    #[must_use]
    pub const fn with_vision(mut self) -> Self {
        self.capabilities.vision = true;
        self
    }
}

impl From<&CustomModelConfig> for ModelConfig {
    fn from(config: &CustomModelConfig) -> Self {
        Self {
            id: config.id.clone(),
            display_name: config.display_name.clone().unwrap_or_else(|| config.id.clone()),
            context_window: config.context_window,
            provider: config.provider.clone(),
            adapter: config.adapter,
            base_url: config.base_url.clone(),
            default_headers: config.headers.clone(),
            default_body: config.body.clone(),
            capabilities: ModelCapabilities {
                vision: config.capabilities.vision,
                streaming: config.capabilities.streaming,
                system_role: config.capabilities.system_role,
                parameters: config.capabilities.parameters.clone(),
            },
        }
    }
}
