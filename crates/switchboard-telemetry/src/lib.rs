//! Logging setup for Switchboard
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! human-readable or a JSON formatting layer.

use switchboard_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured filter, which in turn
/// takes precedence over `default_filter`. Log output goes to stderr so
/// streamed model output on stdout stays clean.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: Option<&TelemetryConfig>, default_filter: &str) -> anyhow::Result<()> {
    let directive = config.map_or(default_filter, |c| c.log_filter.as_str());
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), directive);
    let format = config.map_or(LogFormat::Text, |c| c.format);

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);

            registry
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true);

            registry
                .with(fmt_layer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
        }
    }

    Ok(())
}

/// Pick the first filter directive that parses, falling back to `info`
fn build_filter(env_override: Option<&str>, configured: &str) -> EnvFilter {
    env_override
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins() {
        let filter = build_filter(Some("switchboard_llm=trace"), "warn");
        assert_eq!(filter.to_string(), "switchboard_llm=trace");
    }

    #[test]
    fn configured_filter_used_without_override() {
        let filter = build_filter(None, "debug");
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn invalid_directives_fall_back_to_info() {
        let filter = build_filter(Some("switchboard=loud"), "other=noisy");
        assert_eq!(filter.to_string(), "info");
    }
}
