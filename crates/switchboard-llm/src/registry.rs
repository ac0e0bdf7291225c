//! External collaborators consumed by the adapters and resolver
//!
//! All lookups are synchronous and read-only; implementations must be safe
//! to call from inside a stream decode loop.

use std::collections::HashMap;
use std::sync::RwLock;

use indexmap::IndexMap;
use secrecy::SecretString;
use switchboard_config::{ApprovalMode, CustomModelConfig, ToolServerConfig};

use crate::types::{AttachmentId, ModelConfig};

/// Resolved attachment bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Resolves attachment references to inline data
pub trait AttachmentStore: Send + Sync {
    /// Unknown ids are skipped
    fn resolve(&self, ids: &[AttachmentId]) -> Vec<Attachment>;
}

/// Source of user-defined models
pub trait ModelRegistry: Send + Sync {
    fn list_active_custom_models(&self) -> Vec<ModelConfig>;
}

/// A remote tool server the provider may call
#[derive(Debug, Clone)]
pub struct ToolServer {
    pub label: String,
    pub url: String,
    pub require_approval: ApprovalMode,
    pub allowed_tools: Option<Vec<String>>,
    pub auth_token: Option<SecretString>,
    pub headers: IndexMap<String, String>,
}

/// Source of tool servers attached to outgoing requests
pub trait ToolServerRegistry: Send + Sync {
    fn list_active_servers(&self) -> Vec<ToolServer>;
}

/// Active servers with a usable URL
pub(crate) fn usable_servers(registry: &dyn ToolServerRegistry) -> Vec<ToolServer> {
    registry
        .list_active_servers()
        .into_iter()
        .filter(|server| !server.url.trim().is_empty())
        .collect()
}

/// Store that never resolves anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttachments;

impl AttachmentStore for NoAttachments {
    fn resolve(&self, _ids: &[AttachmentId]) -> Vec<Attachment> {
        Vec::new()
    }
}

/// Attachments held in memory
#[derive(Debug, Default)]
pub struct InMemoryAttachments {
    entries: RwLock<HashMap<AttachmentId, Attachment>>,
}

impl InMemoryAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> AttachmentId {
        let id = AttachmentId(id.into());
        let attachment = Attachment {
            mime_type: mime_type.into(),
            bytes,
        };
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id.clone(), attachment);
        id
    }
}

impl AttachmentStore for InMemoryAttachments {
    fn resolve(&self, ids: &[AttachmentId]) -> Vec<Attachment> {
        let entries = self.entries.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        ids.iter()
            .filter_map(|id| {
                let found = entries.get(id).cloned();
                if found.is_none() {
                    tracing::debug!(attachment = %id.0, "attachment not found");
                }
                found
            })
            .collect()
    }
}

/// Models from the `[[models]]` configuration section
#[derive(Debug, Clone, Default)]
pub struct ConfiguredModels {
    models: Vec<ModelConfig>,
}

impl ConfiguredModels {
    /// Keep only active entries
    pub fn new(configs: &[CustomModelConfig]) -> Self {
        Self {
            models: configs.iter().filter(|c| c.active).map(ModelConfig::from).collect(),
        }
    }
}

impl ModelRegistry for ConfiguredModels {
    fn list_active_custom_models(&self) -> Vec<ModelConfig> {
        self.models.clone()
    }
}

/// Servers from the `[tool_servers]` configuration section
#[derive(Debug, Clone, Default)]
pub struct ConfiguredToolServers {
    servers: Vec<ToolServer>,
}

impl ConfiguredToolServers {
    /// Keep only active entries with a non-empty URL
    pub fn new(configs: &IndexMap<String, ToolServerConfig>) -> Self {
        let servers = configs
            .iter()
            .filter(|(_, c)| c.active && !c.url.trim().is_empty())
            .map(|(label, c)| ToolServer {
                label: label.clone(),
                url: c.url.clone(),
                require_approval: c.require_approval,
                allowed_tools: c.allowed_tools.clone(),
                auth_token: c.auth_token.clone(),
                headers: c.headers.clone(),
            })
            .collect();

        Self { servers }
    }
}

impl ToolServerRegistry for ConfiguredToolServers {
    fn list_active_servers(&self) -> Vec<ToolServer> {
        self.servers.clone()
    }
}
