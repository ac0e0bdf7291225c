//! Model resolution
//!
//! The built-in catalog wins over user-defined models with the same id.
//! Neither source is mutated.

use std::sync::Arc;

use crate::catalog;
use crate::registry::ModelRegistry;
use crate::types::ModelConfig;

/// Resolves model ids against the catalog, then the registry
#[derive(Clone)]
pub struct ModelResolver {
    registry: Arc<dyn ModelRegistry>,
}

impl ModelResolver {
    pub fn new(registry: Arc<dyn ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Configuration for `id`, or `None` if no source knows it
    pub fn resolve(&self, id: &str) -> Option<ModelConfig> {
        if let Some(model) = catalog::builtin(id) {
            return Some(model.clone());
        }

        self.registry
            .list_active_custom_models()
            .into_iter()
            .find(|model| model.id == id)
    }
}
