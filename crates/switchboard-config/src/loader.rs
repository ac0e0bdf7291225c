use std::collections::HashSet;
use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_retry()?;
        self.validate_models()?;
        self.validate_tool_servers()?;
        Ok(())
    }

    fn validate_retry(&self) -> anyhow::Result<()> {
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        if self.retry.base_delay > self.retry.max_delay {
            anyhow::bail!("retry.base_delay must not exceed retry.max_delay");
        }

        Ok(())
    }

    fn validate_models(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();

        for model in &self.models {
            if model.id.trim().is_empty() {
                anyhow::bail!("custom model ids must not be empty");
            }
            if !seen.insert(model.id.as_str()) {
                anyhow::bail!("custom model '{}' is defined more than once", model.id);
            }
        }

        Ok(())
    }

    fn validate_tool_servers(&self) -> anyhow::Result<()> {
        for (label, server) in &self.tool_servers {
            if server.url.is_empty() {
                continue;
            }
            url::Url::parse(&server.url)
                .map_err(|e| anyhow::anyhow!("tool server '{label}' has an invalid url: {e}"))?;
        }

        Ok(())
    }
}
