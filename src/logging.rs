//! Process-wide `tracing` subscriber.

use serde::Deserialize;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt};

const DEFAULT_LEVEL: &str = "info";

/// Console logging options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive, e.g. `info` or `footprint=debug,hyper=warn`.
    /// `RUST_LOG` overrides it when set.
    pub level: String,
    /// One JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LEVEL.to_owned(), json: false }
    }
}

impl LoggingConfig {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    }
}

/// Installs the global subscriber. Fails if one is already installed.
///
/// Access events from the default sink are emitted under
/// [`ACCESS_TARGET`](crate::access::ACCESS_TARGET), so they can be filtered
/// on their own (`footprint::access=info`).
pub fn init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let output = if config.json {
        fmt::layer().json().with_target(true).with_current_span(false).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(output)
        .with(config.filter())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_plain_info() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.level, "info");
        assert!(!config.json);
    }

    #[test]
    fn second_init_is_rejected() {
        let config = LoggingConfig { json: true, ..LoggingConfig::default() };
        // Whichever call installed the subscriber, the next one fails.
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
