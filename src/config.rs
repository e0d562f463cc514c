//! Application configuration.
//!
//! Every struct is `serde::Deserialize` with defaults for anything left out;
//! where the values come from (file, environment, flags) is up to the
//! application.
//!
//! ```rust
//! use footprint::config::{Config, SinkConfig};
//!
//! let config: Config = serde_json::from_str(r#"{
//!     "access_log": { "kind": "file", "path": "/var/log/app/access.log" },
//!     "auth": { "skip": ["GET /health", "POST /auth/*"] }
//! }"#).unwrap();
//!
//! assert!(matches!(config.access_log, SinkConfig::File { .. }));
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use crate::access::ProducerConfig;
use crate::logging::LoggingConfig;
use crate::middleware::SkipList;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub access_log: SinkConfig,
    pub auth: AuthConfig,
}

/// Which [`Sink`](crate::access::Sink) receives access records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    #[default]
    Default,
    File { path: PathBuf },
    Queue(ProducerConfig),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `"METHOD pattern"` entries that bypass token verification.
    pub skip: Vec<String>,
}

impl AuthConfig {
    pub fn skip_list(&self) -> SkipList {
        SkipList::parse(&self.skip)
    }
}
