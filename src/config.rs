//! Database configuration
//!
//! ```yaml
//! store_dir: /var/lib/graph
//! create_reference_node: true
//! default_node_index: node
//! default_relationship_index: relationship
//! query_cache_capacity: 64
//! sync_on_commit: false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Configuration of an embedded `GraphDatabase`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Snapshot directory; `None` keeps the graph in memory only
    pub store_dir: Option<PathBuf>,
    /// Create node 0 in an empty store
    pub create_reference_node: bool,
    /// Index used when `index()` is called without a name for a node
    pub default_node_index: String,
    /// Index used when `index()` is called without a name for a relationship
    pub default_relationship_index: String,
    /// Parsed statements kept in the query cache
    pub query_cache_capacity: usize,
    /// Write a snapshot after every successful commit
    pub sync_on_commit: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            create_reference_node: true,
            default_node_index: "node".to_string(),
            default_relationship_index: "relationship".to_string(),
            query_cache_capacity: 64,
            sync_on_commit: false,
        }
    }
}

impl GraphConfig {
    /// In-memory configuration with defaults
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Defaults, persisted under `dir`
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: GraphConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "query_cache_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.default_node_index.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_node_index",
                reason: "must not be empty".to_string(),
            });
        }
        if self.default_relationship_index.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_relationship_index",
                reason: "must not be empty".to_string(),
            });
        }
        if self.default_node_index == self.default_relationship_index {
            return Err(ConfigError::InvalidValue {
                field: "default_relationship_index",
                reason: "must differ from default_node_index".to_string(),
            });
        }
        if self.sync_on_commit && self.store_dir.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "sync_on_commit",
                reason: "requires store_dir".to_string(),
            });
        }
        Ok(())
    }
}
