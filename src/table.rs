//! @ai:module:intent Accumulate annotation occurrences across every file of a run
//! @ai:module:layer application
//! @ai:module:public_api AnnotationTable, TableSnapshot
//! @ai:module:depends_on annotation, classifier, error

use crate::annotation::Annotation;
use crate::classifier::is_identifier;
use crate::error::{CapacityKind, Error, Result};
use serde::{Deserialize, Serialize};

/// @ai:intent Bounded, append-only-until-reset registry of annotation occurrences
/// @ai:invariant entries.len() <= capacity, order equals first-recorded order
#[derive(Debug, Clone)]
pub struct AnnotationTable {
    entries: Vec<Annotation>,
    capacity: usize,
}

/// @ai:intent Flat copy of the table with its count, as consumed by generators
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSnapshot {
    pub count: usize,
    pub annotations: Vec<Annotation>,
}

impl AnnotationTable {
    /// @ai:intent Create an empty table with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// @ai:intent Record an annotation, signalling when the table is full
    /// @ai:post on Err the table is unchanged
    pub fn push(&mut self, annotation: Annotation) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(Error::CapacityExceeded {
                kind: CapacityKind::Annotations,
                limit: self.capacity,
            });
        }
        self.entries.push(annotation);
        Ok(())
    }

    pub fn entries(&self) -> &[Annotation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// @ai:intent Copy the table into the flat form the generators serialize
    /// @ai:effects pure
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            count: self.entries.len(),
            annotations: self.entries.clone(),
        }
    }

    /// @ai:intent Release every recorded annotation
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl TableSnapshot {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// @ai:intent Distinct target function names in first-seen order
    /// @ai:post only names that are valid C identifiers are returned
    /// @ai:effects pure
    pub fn distinct_targets(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for annotation in &self.annotations {
            let name = annotation.target_name.as_str();
            if !is_identifier(name) {
                tracing::warn!(
                    "Skipping declaration for @{} target {:?}: not a C identifier",
                    annotation.name,
                    name
                );
                continue;
            }
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }
}
