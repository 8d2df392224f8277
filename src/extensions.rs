//! @ai:module:intent Store custom annotation aliases and resolve them to base annotations
//! @ai:module:layer application
//! @ai:module:public_api ExtensionRegistry
//! @ai:module:depends_on annotation, classifier, error

use crate::annotation::Extension;
use crate::classifier::{extract_extension_definition, is_extension_definition};
use crate::error::{CapacityKind, Error, Result};
use std::path::Path;

/// @ai:intent Bounded, insertion-ordered registry of extensions
/// @ai:invariant entries.len() <= capacity
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    entries: Vec<Extension>,
    capacity: usize,
}

impl ExtensionRegistry {
    /// @ai:intent Create an empty registry with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// @ai:intent Append an extension, signalling when the registry is full
    /// @ai:post on Err the registry is unchanged
    pub fn register(&mut self, extension: Extension) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(Error::CapacityExceeded {
                kind: CapacityKind::Extensions,
                limit: self.capacity,
            });
        }
        tracing::debug!(
            name = %extension.name,
            base = %extension.base,
            base_arg = %extension.base_arg,
            "registered extension"
        );
        self.entries.push(extension);
        Ok(())
    }

    /// @ai:intent Register the extension defined on a line, if any
    /// @ai:post Ok(false) when the line does not define an extension
    pub fn register_line(&mut self, line: &str) -> Result<bool> {
        if !is_extension_definition(line) {
            return Ok(false);
        }
        match extract_extension_definition(line) {
            Some(extension) => self.register(extension).map(|_| true),
            None => {
                tracing::debug!(line, "extension definition without a name, skipped");
                Ok(false)
            }
        }
    }

    /// @ai:intent Load every extension definition from a declarations file
    /// @ai:post returns how many extensions were registered
    /// @ai:edge_cases unreadable file logs a warning and loads nothing
    /// @ai:effects fs:read
    pub fn load(&mut self, path: &Path) -> usize {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "Cannot read extension declarations {}: {}",
                    path.display(),
                    e
                );
                return 0;
            }
        };

        let mut loaded = 0;
        for line in content.lines() {
            match self.register_line(line) {
                Ok(true) => loaded += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Stopped loading {}: {}", path.display(), e);
                    break;
                }
            }
        }

        tracing::info!("Loaded {} extensions from {}", loaded, path.display());
        loaded
    }

    /// @ai:intent Find the first extension registered under a name
    /// @ai:effects pure
    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// @ai:intent Resolve an extension name to its base annotation, single hop
    /// @ai:effects pure
    pub fn resolve_base(&self, name: &str) -> Option<&str> {
        self.get(name).map(|e| e.base.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// @ai:intent Drop every registered extension
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
