//! Client configuration.
//!
//! This module defines the [`ClientConfig`] struct that controls how a
//! [`Session`](crate::Session) addresses buckets, handles siblings and runs
//! index queries.
//!
//! # Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `default_bucket_type` | `"default"` | Bucket type used by `Session::bucket` |
//! | `write_back_policy` | `surface` | What a failed sibling write-back does |
//! | `resolve_siblings` | true | Run conflict resolution on multi-sibling fetches |
//! | `max_index_results` | 0 | Default index query limit (0 = unlimited) |
//! | `enable_logging` | false | Emit a debug line per facade command |
//!
//! # Examples
//!
//! ```
//! use convkv_core::{ClientConfig, WritePolicy};
//!
//! let config = ClientConfig {
//!     write_back_policy: WritePolicy::LogOnly,
//!     ..Default::default()
//! };
//! assert_eq!(config.default_bucket_type, "default");
//! ```
//!
//! Loading from JSON, with every field optional:
//!
//! ```
//! use convkv_core::ClientConfig;
//!
//! let config = ClientConfig::from_json(r#"{"max_index_results": 50}"#).unwrap();
//! assert_eq!(config.max_index_results, 50);
//! assert!(config.resolve_siblings);
//! ```

use crate::core::error::{MapperError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What happens when writing a resolved sibling value back fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Fail the fetch with `MapperError::WriteBack`.
    #[default]
    Surface,
    /// Log a warning and return the resolved value anyway. The conflict will
    /// be observed again by the next reader.
    LogOnly,
}

/// Session configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bucket type for buckets opened without an explicit one.
    #[serde(default = "default_bucket_type")]
    pub default_bucket_type: String,

    #[serde(default)]
    pub write_back_policy: WritePolicy,

    /// When disabled, any fetch with more than one sibling fails with
    /// `NoConflictResolver`.
    #[serde(default = "default_true")]
    pub resolve_siblings: bool,

    /// Limit applied to index queries that set none. Set to 0 for no limit.
    #[serde(default)]
    pub max_index_results: u32,

    #[serde(default)]
    pub enable_logging: bool,
}

fn default_bucket_type() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            default_bucket_type: default_bucket_type(),
            write_back_policy: WritePolicy::Surface,
            resolve_siblings: true,
            max_index_results: 0,
            enable_logging: false,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|e| MapperError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    ///
    /// A missing or blank file yields the default configuration.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                return Ok(ClientConfig::default());
            }
            Err(e) => return Err(MapperError::Config(format!("{}: {}", path.display(), e))),
        };

        if content.trim().is_empty() {
            tracing::warn!("Config file {} is empty, using default config", path.display());
            return Ok(ClientConfig::default());
        }
        Self::from_json(&content)
    }

    /// Write the configuration as pretty-printed JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| MapperError::Config(format!("{}: {}", path.display(), e)))
    }

    fn validate(&self) -> Result<()> {
        if self.default_bucket_type.trim().is_empty() {
            return Err(MapperError::Config(
                "default_bucket_type must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
