//! @ai:module:intent Define data structures for annotations and extensions
//! @ai:module:layer domain
//! @ai:module:public_api Annotation, BlockKind, Extension, AnnotationUse, Location, WHEN_ANNOTATION
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The only base annotation with functional meaning: a conditional guard.
pub const WHEN_ANNOTATION: &str = "When";

/// @ai:intent Represents a source code location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
}

impl Location {
    /// @ai:intent Create a new Location
    pub fn new(file: PathBuf, line: usize) -> Self {
        Self { file, line }
    }
}

/// @ai:intent Categorizes what kind of block an annotation is attached to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Function,
}

impl BlockKind {
    /// @ai:intent Get the tag written into generated records
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Function => "function",
        }
    }
}

/// @ai:intent One recorded occurrence of an annotation on a function
/// @ai:invariant args.len() never exceeds the configured argument cap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub target_name: String,
    #[serde(default)]
    pub kind: BlockKind,
    pub is_removed: bool,
    pub args: Vec<String>,
    pub condition: Option<String>,
    #[serde(default)]
    pub location: Location,
}

impl Annotation {
    /// @ai:intent Create an annotation on a function, deriving is_removed from the condition
    /// @ai:post is_removed == (condition == Some(disable_symbol))
    pub fn function(
        name: impl Into<String>,
        target_name: impl Into<String>,
        args: Vec<String>,
        condition: Option<String>,
        disable_symbol: &str,
    ) -> Self {
        let is_removed = condition.as_deref() == Some(disable_symbol);
        Self {
            name: name.into(),
            target_name: target_name.into(),
            kind: BlockKind::Function,
            is_removed,
            args,
            condition,
            location: Location::default(),
        }
    }

    /// @ai:intent Attach the source location the annotation was found at
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// @ai:intent First argument, conventionally a human description
    pub fn description(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// @ai:intent A custom annotation name registered as an alias for a base annotation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Extension {
    pub name: String,
    pub args: String,
    pub base: String,
    pub base_arg: String,
}

impl Extension {
    /// @ai:intent Check whether this extension carries conditional-guard semantics
    /// @ai:effects pure
    pub fn is_conditional(&self) -> bool {
        self.base == WHEN_ANNOTATION
    }

    /// @ai:intent Parameter names declared by the extension, in order
    /// @ai:example (args = "condition, desc") -> ["condition", "desc"]
    /// @ai:effects pure
    pub fn params(&self) -> Vec<&str> {
        self.args
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// @ai:intent An annotation comment seen in source, not yet bound to a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationUse {
    pub name: String,
    pub arg: String,
    pub line: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_removed_follows_disable_symbol() {
        let disabled = Annotation::function(
            "Disable",
            "f",
            vec![],
            Some("OFF".to_string()),
            "OFF",
        );
        let guarded = Annotation::function(
            "Test",
            "g",
            vec![],
            Some("TARGET_TEST".to_string()),
            "OFF",
        );
        let plain = Annotation::function("Setup", "h", vec![], None, "OFF");

        assert!(disabled.is_removed);
        assert!(!guarded.is_removed);
        assert!(!plain.is_removed);
    }

    #[test]
    fn test_extension_params() {
        let ext = Extension {
            name: "Test".to_string(),
            args: "condition, desc".to_string(),
            base: "When".to_string(),
            base_arg: "cond".to_string(),
        };
        assert_eq!(ext.params(), vec!["condition", "desc"]);
        assert!(ext.is_conditional());
        assert!(!Extension::default().is_conditional());
    }
}
