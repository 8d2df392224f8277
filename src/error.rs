//! @ai:module:intent Define error types for the annotation engine
//! @ai:module:layer domain
//! @ai:module:public_api Error, CapacityKind, Result
//! @ai:module:stateless true

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Names the bounded container that ran out of room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    Annotations,
    Extensions,
}

impl fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapacityKind::Annotations => "annotation table",
            CapacityKind::Extensions => "extension registry",
        };
        f.write_str(name)
    }
}

/// @ai:intent Unified error type for all engine operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input:output pair: {0}")]
    InvalidPair(String),

    #[error("Capacity exceeded: {kind} is limited to {limit} entries")]
    CapacityExceeded { kind: CapacityKind, limit: usize },

    #[error("Invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// @ai:intent Check whether this error is a capacity signal rather than a failure
    /// @ai:effects pure
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Error::CapacityExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
