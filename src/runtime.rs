//! @ai:module:intent Query annotated functions at run time and invoke their registered callables
//! @ai:module:layer application
//! @ai:module:public_api RuntimeTable, AnnotatedBlock, Callable
//! @ai:module:depends_on annotation, table, error
//!
//! A consuming program is handed a `RuntimeTable` explicitly. When no
//! generated manifest is available it gets an empty table and every query
//! simply finds nothing.

use crate::annotation::Annotation;
use crate::error::{Error, Result};
use crate::table::TableSnapshot;
use std::collections::HashMap;
use std::path::Path;

/// Function signature of an annotated block.
pub type Callable = fn();

/// @ai:intent Annotation table loaded for queries, plus the name-to-callable map
#[derive(Debug, Clone, Default)]
pub struct RuntimeTable {
    annotations: Vec<Annotation>,
    callables: HashMap<String, Callable>,
}

/// @ai:intent One query hit: the record and its callable, if it may run
#[derive(Debug, Clone, Copy)]
pub struct AnnotatedBlock<'a> {
    pub annotation: &'a Annotation,
    pub target: Option<Callable>,
}

impl AnnotatedBlock<'_> {
    /// @ai:intent Call the target if it is present
    /// @ai:post returns whether anything was called
    /// @ai:effects calls user code
    pub fn invoke(&self) -> bool {
        match self.target {
            Some(target) => {
                target();
                true
            }
            None => false,
        }
    }
}

impl RuntimeTable {
    /// @ai:intent Wrap a list of records as stored, without compile-time resolution
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self {
            annotations,
            callables: HashMap::new(),
        }
    }

    /// @ai:intent Build a table the way a compiled data artifact sees it
    /// @ai:post a record whose condition is not in `defined` is removed
    /// @ai:effects pure
    pub fn resolve(snapshot: &TableSnapshot, defined: &[&str]) -> Self {
        let annotations = snapshot
            .annotations
            .iter()
            .cloned()
            .map(|mut annotation| {
                if let Some(condition) = annotation.condition.as_deref() {
                    if !defined.contains(&condition) {
                        annotation.is_removed = true;
                    }
                }
                annotation
            })
            .collect();
        Self::new(annotations)
    }

    /// @ai:intent Parse a JSON manifest written by the generator
    /// @ai:effects pure
    pub fn from_manifest(json: &str) -> Result<Self> {
        let snapshot: TableSnapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot.annotations))
    }

    /// @ai:intent Load a JSON manifest from disk
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_manifest(&content)
    }

    /// @ai:intent Load a manifest, degrading to an empty table when it is missing or invalid
    /// @ai:effects fs:read
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!("No annotation table available ({}), using an empty one", e);
                Self::default()
            }
        }
    }

    /// @ai:intent Register the callable for a function name
    pub fn register(&mut self, target_name: impl Into<String>, callable: Callable) {
        self.callables.insert(target_name.into(), callable);
    }

    /// @ai:intent Builder form of register
    pub fn with(mut self, target_name: impl Into<String>, callable: Callable) -> Self {
        self.register(target_name, callable);
        self
    }

    /// @ai:intent Every record with the given annotation name, in table order
    /// @ai:post target is None for removed records and unregistered functions
    /// @ai:effects pure
    pub fn find_annotated_blocks(&self, name: &str) -> Vec<AnnotatedBlock<'_>> {
        self.annotations
            .iter()
            .filter(|annotation| annotation.name == name)
            .map(|annotation| AnnotatedBlock {
                annotation,
                target: if annotation.is_removed {
                    None
                } else {
                    self.callables.get(&annotation.target_name).copied()
                },
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}
