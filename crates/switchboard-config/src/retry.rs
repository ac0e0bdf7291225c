use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Retry policy applied around provider calls
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, doubled per attempt
    #[serde(default = "default_base_delay", deserialize_with = "deserialize_duration")]
    pub base_delay: Duration,
    /// Upper bound for the computed delay
    #[serde(default = "default_max_delay", deserialize_with = "deserialize_duration")]
    pub max_delay: Duration,
    /// Scale each delay by a random factor in `[0.5, 1.0]`
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            jitter: default_jitter(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

const fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

const fn default_jitter() -> bool {
    true
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(serde::de::Error::custom)
}
