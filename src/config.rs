//! @ai:module:intent Configuration structs for the annotation engine
//! @ai:module:layer infrastructure
//! @ai:module:public_api EngineConfig, LimitConfig, DisableConfig
//! @ai:module:stateless true

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// @ai:intent Main configuration for one engine run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub limits: LimitConfig,
    #[serde(default)]
    pub disable: DisableConfig,
}

/// @ai:intent Capacity limits for the bounded registries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitConfig {
    #[serde(default = "default_max_annotations")]
    pub max_annotations: usize,
    #[serde(default = "default_max_extensions")]
    pub max_extensions: usize,
    #[serde(default = "default_max_args")]
    pub max_args: usize,
}

/// @ai:intent Built-in disable semantic: an annotation name and its never-defined symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisableConfig {
    #[serde(default = "default_disable_annotation")]
    pub annotation: String,
    #[serde(default = "default_disable_symbol")]
    pub symbol: String,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_annotations: default_max_annotations(),
            max_extensions: default_max_extensions(),
            max_args: default_max_args(),
        }
    }
}

impl Default for DisableConfig {
    fn default() -> Self {
        Self {
            annotation: default_disable_annotation(),
            symbol: default_disable_symbol(),
        }
    }
}

fn default_max_annotations() -> usize {
    1000
}

fn default_max_extensions() -> usize {
    1000
}

fn default_max_args() -> usize {
    8
}

fn default_disable_annotation() -> String {
    "Disable".to_string()
}

fn default_disable_symbol() -> String {
    "__ANNOTATION_DISABLED__".to_string()
}

impl EngineConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// @ai:intent Parse configuration from TOML text
    /// @ai:effects pure
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// @ai:intent Build a config with every capacity set to the same limit
    /// @ai:effects pure
    pub fn with_capacity(limit: usize) -> Self {
        Self {
            limits: LimitConfig {
                max_annotations: limit,
                max_extensions: limit,
                ..LimitConfig::default()
            },
            ..Self::default()
        }
    }
}
